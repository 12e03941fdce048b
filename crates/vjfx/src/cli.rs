use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "vjfx",
    author,
    version,
    about = "Catalog-driven GPU effects preview",
    arg_required_else_help = false
)]
pub struct Args {
    /// Effect id to start with; defaults to the first catalog entry.
    #[arg(value_name = "EFFECT")]
    pub effect: Option<String>,

    /// Catalog root holding the category list files and effect sources.
    #[arg(long, value_name = "DIR", env = "VJFX_ASSETS", default_value = "assets")]
    pub assets: PathBuf,

    /// Still image to feed the effect input.
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Window size (e.g. `1280x720`).
    #[arg(
        long,
        value_name = "WIDTHxHEIGHT",
        value_parser = parse_surface_size,
        default_value = "1280x720"
    )]
    pub size: (u32, u32),

    /// List catalog entries and exit.
    #[arg(long)]
    pub list: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let normalized = value.trim().to_ascii_lowercase();
    let (w, h) = normalized
        .split_once('x')
        .ok_or_else(|| format!("invalid size '{value}'; use WIDTHxHEIGHT"))?;
    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{w}'"))?;
    let height: u32 = h
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{h}'"))?;
    if width == 0 || height == 0 {
        return Err("size must be non-zero".to_string());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_size_pairs() {
        assert_eq!(parse_surface_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_surface_size(" 1920X1080 "), Ok((1920, 1080)));
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("0x720").is_err());
    }
}
