//! Pigment - Color math and theme CSS assembly for Teinte.
//!
//! The primitives the build integration delegates to:
//!
//! - [`color`]: literal parsing and HSL conversion
//! - [`scan`]: finding color literals in declaration values
//! - [`css`]: rule-level stylesheet splitting and compact rendering
//! - [`scope`]: aligning per-scope compiled outputs into shared and theme CSS
//! - [`palette`]: deriving a full palette from one primary color
//!
//! # Example
//!
//! ```
//! use teinte_pigment::palette::{derive_palette, HueDiffControls, PaletteConfig};
//!
//! let config = PaletteConfig::new("#1890ff", HueDiffControls::default(), &[]).unwrap();
//! let palette = derive_palette(".btn{color:#1890ff;margin:0}", &config, None).unwrap();
//! assert_eq!(palette.style_content, ".btn{color:#1890ff}");
//! ```

pub mod color;
pub mod css;
pub mod error;
pub mod palette;
pub mod scan;
pub mod scope;

pub use color::{parse_color, Hsla, Rgba};
pub use error::{PigmentError, PigmentResult};
pub use palette::{
    derive_color, derive_palette, ColorRole, ForcedColor, ForcedColors, HueDiffControls,
    PaletteConfig, ThemePalette,
};
pub use scope::ScopedCss;
