//! lipi: a small graphical terminal emulator.

mod app;
mod config;
mod input;
mod renderer;
mod terminal;

use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::process;

use app::App;
use config::{CliArgs, Config, ThemeName};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const HELP_TEXT: &str = r#"lipi - a small graphical terminal emulator

USAGE:
    lipi [OPTIONS]

OPTIONS:
    -c, --config <PATH>     Path to config file (default: ~/.config/lipi/config.toml)
    -f, --font-size <SIZE>  Font size in points (default: 14.0)
    -t, --theme <THEME>     Theme name: dark, light
    -s, --shell <SHELL>     Shell command to run (default: $SHELL)
    -h, --help              Print help information
    -V, --version           Print version information

ENVIRONMENT VARIABLES:
    LIPI_FONT_SIZE          Override font size
    LIPI_FONT_PATH          Path to a monospace font file
    LIPI_THEME              Override theme
    LIPI_SHELL              Override shell command

KEYBINDINGS:
    Shift+Up/Down           Scroll the history one line
    Shift+PageUp/PageDown   Scroll the history one page
"#;

fn parse_args() -> Result<CliArgs, String> {
    let args: Vec<String> = env::args().collect();
    let mut cli_args = CliArgs::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                println!("{}", HELP_TEXT);
                process::exit(0);
            }
            "-V" | "--version" => {
                println!("lipi {}", VERSION);
                process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("--config requires a path argument".to_string());
                }
                cli_args.config_path = Some(PathBuf::from(&args[i]));
            }
            "-f" | "--font-size" => {
                i += 1;
                if i >= args.len() {
                    return Err("--font-size requires a size argument".to_string());
                }
                cli_args.font_size = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("invalid font size: {}", args[i]))?,
                );
            }
            "-t" | "--theme" => {
                i += 1;
                if i >= args.len() {
                    return Err("--theme requires a theme name".to_string());
                }
                cli_args.theme = Some(
                    ThemeName::parse(&args[i]).ok_or_else(|| format!("unknown theme: {}", args[i]))?,
                );
            }
            "-s" | "--shell" => {
                i += 1;
                if i >= args.len() {
                    return Err("--shell requires a shell command".to_string());
                }
                cli_args.shell = Some(args[i].clone());
            }
            arg => {
                return Err(format!("unknown option: {}. Use --help for usage.", arg));
            }
        }
        i += 1;
    }

    Ok(cli_args)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("starting lipi v{}", VERSION);

    let cli_args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let config = match Config::load_with_args(&cli_args) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("using default configuration: {}", e);
            Config::default()
        }
    };

    let app = App::new(config)?;
    app.run()?;

    log::info!("lipi exited");
    Ok(())
}
