//! Extract command - Assemble per-scope theme files from per-scope compiled CSS

use std::fs;
use std::path::PathBuf;

use clap::Args;
use teinte::config::TeinteConfig;
use teinte_atelier::extract::theme_asset_name;
use teinte_atelier::substitute::write_file;
use teinte_atelier::{
    extract_theme_css, BuildCommand, ExtractOptions, ScopeRegistry, ScopeVarConfig,
    SessionBuilder, ThemeError, ThemeOptions, ThemeResult,
};

#[derive(Args)]
pub struct ExtractArgs {
    /// `scope=file.css` pairs: the same stylesheet compiled once per scope
    #[arg(required = true, value_parser = parse_input)]
    pub inputs: Vec<(String, PathBuf)>,

    /// Output directory
    #[arg(short, long, default_value = "./dist")]
    pub out: PathBuf,

    /// Emit theme rules without the scope class prefix
    #[arg(long)]
    pub remove_scope_name: bool,

    /// Also write the CSS shared by every scope to this file
    #[arg(long)]
    pub common: Option<PathBuf>,
}

fn parse_input(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((scope, file)) if !scope.is_empty() && !file.is_empty() => {
            Ok((scope.to_string(), PathBuf::from(file)))
        }
        _ => Err(format!("expected `scope=file.css`, got `{value}`")),
    }
}

pub fn run(args: ExtractArgs, config: &TeinteConfig) -> ThemeResult<()> {
    let mut options = ThemeOptions::from_plugin_options(&config.plugin);
    options.arbitrary_mode = false;
    options.extract = true;
    options.remove_css_scope_name |= args.remove_scope_name;

    let mut registry = ScopeRegistry::new();
    let mut outputs = Vec::with_capacity(args.inputs.len());
    for (scope, file) in &args.inputs {
        registry.register(&ScopeVarConfig::new(scope.as_str(), [file.as_path()]));
        let css = fs::read_to_string(file).map_err(|e| ThemeError::io(file, e))?;
        outputs.push((scope.clone(), css));
    }

    let session = SessionBuilder::new(options)
        .root(config.project_root())
        .command(BuildCommand::Build)
        .registry(registry)
        .build();
    let common = session.compile_scoped("cli", &outputs)?;
    if let Some(path) = &args.common {
        write_file(path, &common)?;
        eprintln!("Wrote {}", path.display());
    }

    for theme in extract_theme_css(&session, &ExtractOptions::from_session(&session)) {
        let path = args.out.join(theme_asset_name(&session, &theme.scope_name, ""));
        write_file(&path, &theme.css)?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}
