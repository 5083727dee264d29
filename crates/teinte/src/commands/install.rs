//! Install command - Substitute the configured preprocessors

use clap::Args;
use teinte::config::TeinteConfig;
use teinte_atelier::{
    BuildCommand, InstallOutcome, PreprocessorSubstitution, RuntimeParams, SessionBuilder,
    StyleLang, SubstituteParams, ThemeResult,
};

#[derive(Args)]
pub struct InstallArgs {
    /// Language to substitute (repeatable, default: every configured language)
    #[arg(short, long, value_parser = super::parse_lang)]
    pub lang: Vec<StyleLang>,
}

pub fn run(args: InstallArgs, config: &TeinteConfig) -> ThemeResult<()> {
    let langs = config.langs(&args.lang);
    if langs.is_empty() {
        eprintln!("No style language configured (use --lang)");
        return Ok(());
    }

    let session = SessionBuilder::from_plugin_options(&config.plugin)
        .root(config.project_root())
        .command(BuildCommand::Build)
        .build();
    let substitution = PreprocessorSubstitution::for_session(&session);
    substitution.write_runtime_params(&RuntimeParams::from_session(&session))?;

    let params = SubstituteParams::from_options(session.options());
    for lang in langs {
        match substitution.install(lang, &params)? {
            InstallOutcome::Installed { fingerprint, .. } => {
                eprintln!("{lang}: installed substitute {fingerprint}");
            }
            InstallOutcome::AlreadyCurrent { fingerprint, .. } => {
                eprintln!("{lang}: substitute {fingerprint} already installed");
            }
        }
    }
    Ok(())
}
