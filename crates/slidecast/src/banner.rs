use colored::Colorize;

const LOGO: &str = r"   _ _    _
 _| (_)__| |___ __ __ _ __| |_
(_-< | / _` / -_) _/ _` (_-<  _|
/__/_|_\__,_\___\__\__,_/__/\__|";

pub fn print_banner_with_version() {
    println!("{}", LOGO.cyan().bold());
    println!();
    println!(
        "  {} {}",
        "slidecast".bold(),
        env!("CARGO_PKG_VERSION").dimmed()
    );
    println!("  {}", env!("CARGO_PKG_DESCRIPTION").dimmed());
}

/// What the server is about to offer, printed once at startup.
pub struct StartupInfo<'a> {
    pub file: &'a str,
    pub slides: usize,
    pub audience_url: &'a str,
    pub presenter_url: &'a str,
    pub public_url: Option<&'a str>,
    pub watching: bool,
    pub open_navigation: bool,
}

pub fn print_startup(info: &StartupInfo<'_>) {
    println!();
    println!(
        "  {} {} {}",
        "slidecast".cyan().bold(),
        info.file.bold(),
        format!("({} slides)", info.slides).dimmed()
    );
    println!();
    println!("  {:<11}{}", "Audience".green(), info.audience_url);
    println!("  {:<11}{}", "Presenter".yellow(), info.presenter_url);
    if let Some(url) = info.public_url {
        println!("  {:<11}{}", "Public".magenta(), url);
    }
    println!();
    if info.watching {
        println!("  {}", "Watching for changes".dimmed());
    }
    if info.open_navigation {
        println!("  {}", "Navigation open to every viewer".dimmed());
    }
    println!("  {}", "Press Ctrl+C to stop".dimmed());
    println!();
}
