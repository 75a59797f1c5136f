use console::{style, Term};
use tui_banner::{Align, Banner, ColorMode, Fill, Gradient, GradientDirection, Palette};

const BRAND: u8 = 173;
const DIM: u8 = 240;

const TAGLINE: &str = "LLM-assisted multi-layer reconnaissance";

/// Print the startup banner with the run parameters.
pub fn print_banner(target: &str, mode: &str, steps: u8) {
    let term = Term::stdout();
    let (_, term_cols) = term.size();
    let term_w = term_cols as usize;

    let palette = Palette::from_hex(&["#FFD787", "#D7875F", "#AF5F5F", "#5F5F87"]);
    let gradient = Gradient::new(palette.colors().to_vec(), GradientDirection::Diagonal);

    let banner_text = match Banner::new("HAWX") {
        Ok(b) => b
            .gradient(gradient)
            .fill(Fill::Keep)
            .align(Align::Left)
            .trim_vertical(true)
            .color_mode(ColorMode::TrueColor)
            .width(term_w)
            .render(),
        Err(_) => format!("  {}\n", style("HAWX").color256(BRAND).bold()),
    };

    println!();
    print!("{}", banner_text);
    println!(
        "  {}  {}",
        style(TAGLINE).white().bold(),
        style(format!("v{} ({})", env!("CARGO_PKG_VERSION"), option_env!("GIT_HASH").unwrap_or("dev")))
            .color256(DIM),
    );
    println!(
        "  {} Only scan systems you own or are explicitly authorized to test.",
        style("\u{26a0}").color256(BRAND).bold()
    );
    println!();
    println!("  {:<8} {}", style("target").dim(), style(target).white().bold());
    println!("  {:<8} {}", style("mode").dim(), mode);
    println!("  {:<8} {}", style("layers").dim(), steps);
}
