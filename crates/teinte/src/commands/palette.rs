//! Palette command - Derive the arbitrary-mode theme payload of CSS files

use std::fs;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use teinte::config::TeinteConfig;
use teinte_atelier::{
    create_set_custom_theme, BuildCommand, CreateThemeOptions, CustomThemeUpdate, SessionBuilder,
    ThemeError, ThemeOptions, ThemeResult,
};
use teinte_carton::path::path_to_posix;
use teinte_pigment::Rgba;

#[derive(Args)]
pub struct PaletteArgs {
    /// Compiled CSS files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Resolve the palette for this primary color
    #[arg(short, long)]
    pub primary: Option<String>,

    /// Primary color the sources are written in (default: from config)
    #[arg(long)]
    pub default_primary: Option<String>,

    /// Also print the `setCustomTheme` runtime function
    #[arg(long)]
    pub runtime: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaletteReport {
    #[serde(flatten)]
    update: CustomThemeUpdate,
    #[serde(skip_serializing_if = "Option::is_none")]
    set_custom_theme_content: Option<String>,
}

fn check_color(color: &str) -> ThemeResult<()> {
    Rgba::parse(color)
        .map(|_| ())
        .map_err(|e| ThemeError::InvalidPrimaryColor {
            color: color.to_string(),
            reason: e.to_string(),
        })
}

pub fn run(args: PaletteArgs, config: &TeinteConfig) -> ThemeResult<()> {
    let mut options = ThemeOptions::from_plugin_options(&config.plugin);
    options.arbitrary_mode = true;
    if let Some(color) = &args.default_primary {
        options.default_primary_color = color.clone();
    }
    check_color(&options.default_primary_color)?;
    if let Some(color) = &args.primary {
        check_color(color)?;
    }

    let session = SessionBuilder::new(options)
        .root(config.project_root())
        .command(BuildCommand::Build)
        .build();
    for file in &args.files {
        let css = fs::read_to_string(file).map_err(|e| ThemeError::io(file, e))?;
        session.compile_arbitrary(&path_to_posix(file), &css);
    }

    let create = CreateThemeOptions {
        primary_color: args.primary.clone(),
        ..Default::default()
    };
    let Some(output) = create_set_custom_theme(&session, &create) else {
        eprintln!("No theme could be derived (see warnings above)");
        return Ok(());
    };

    let report = PaletteReport {
        update: CustomThemeUpdate::from(&*output),
        set_custom_theme_content: args
            .runtime
            .then(|| output.set_custom_theme_content.clone()),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
