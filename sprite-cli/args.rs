use std::env;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct Args {
    /// Optional TOML file with locator tuning
    pub config_path: Option<PathBuf>,
    pub debug: bool,
}

impl Args {
    /// Parse the process arguments. `None` means the program should exit,
    /// either after printing help/version or on a bad argument.
    pub fn parse() -> Option<Self> {
        Self::parse_from(env::args().skip(1))
    }

    pub fn parse_from<I, S>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Args::default();

        for arg in args {
            let arg = arg.as_ref();
            if arg == "--help" || arg == "-h" {
                print_help();
                return None;
            } else if arg == "--version" || arg == "-v" {
                println!("spritefind v{}", env!("CARGO_PKG_VERSION"));
                return None;
            } else if arg == "--debug" {
                parsed.debug = true;
            } else if let Some(path) = arg.strip_prefix("--config=") {
                if path.is_empty() {
                    eprintln!("❌ Missing path in --config=");
                    return None;
                }
                parsed.config_path = Some(PathBuf::from(path));
            } else {
                eprintln!("❌ Unknown argument: {}", arg);
                print_help();
                return None;
            }
        }

        Some(parsed)
    }
}

fn print_help() {
    println!("🔎 Sprite locator and image equality checker");
    println!();
    println!("USAGE:");
    println!("    spritefind [FLAGS]");
    println!();
    println!("Finds charizard.png inside hq720.jpg, saves the match as pokemon_sprite.png,");
    println!("then reports whether charizard.png and hq720.jpg are pixel-identical.");
    println!();
    println!("FLAGS:");
    println!("    --config=FILE       Load locator tuning from a TOML file");
    println!("    --debug             Enable debug logging (RUST_LOG overrides)");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
}
