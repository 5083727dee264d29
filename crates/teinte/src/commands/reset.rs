//! Reset command - Restore the pristine preprocessors

use clap::Args;
use teinte::config::TeinteConfig;
use teinte_atelier::{PreprocessorSubstitution, StyleLang, ThemeError, ThemeResult};

#[derive(Args)]
pub struct ResetArgs {
    /// Language to restore (repeatable, default: every installed language)
    #[arg(short, long, value_parser = super::parse_lang)]
    pub lang: Vec<StyleLang>,
}

pub fn run(args: ResetArgs, config: &TeinteConfig) -> ThemeResult<()> {
    let substitution = PreprocessorSubstitution::new(config.project_root());
    let explicit = !args.lang.is_empty();
    let langs = if explicit {
        args.lang
    } else {
        StyleLang::ALL.to_vec()
    };

    let mut packages = Vec::new();
    for lang in langs {
        if packages.contains(&lang.package_name()) {
            continue;
        }
        packages.push(lang.package_name());
        match substitution.reset(lang) {
            Ok(true) => eprintln!("{lang}: restored original package"),
            Ok(false) => eprintln!("{lang}: not substituted"),
            Err(ThemeError::MissingPreprocessor { .. }) if !explicit => {
                tracing::debug!(%lang, "no package to restore");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
