use std::path::Path;
use std::process;
use std::time::Instant;

use log::{error, info, warn};
use sprite_cli::args::Args;
use sprite_cli::{
    compare_images, init_thread_pool, LocateOutcome, LocatorConfig, SpriteLocator, SpriteResult, DEFAULT_OUTPUT_PATH,
    DEFAULT_SCREENSHOT_PATH, DEFAULT_TEMPLATE_PATH,
};

fn main() {
    let Some(args) = Args::parse() else {
        return;
    };

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = match load_config(args.config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(2);
        }
    };

    if let Err(e) = init_pool(config.orb.n_threads) {
        warn!("{}, using the existing pool", e);
    }

    let t0 = Instant::now();
    match extract_sprite(config) {
        Ok(LocateOutcome::NoTemplateDescriptors) => println!("Could not find descriptors for the template."),
        Ok(LocateOutcome::Extracted { region, output, inliers, .. }) => {
            info!("sprite region {} ({} inliers) written to {:?}", region, inliers, output);
            println!("Pokémon sprite extracted successfully!");
        }
        Err(e) => {
            error!("{}", e);
            println!("❌ {}", e);
        }
    }
    info!("extraction took {:.2?}", t0.elapsed());

    match images_equal(DEFAULT_TEMPLATE_PATH, DEFAULT_SCREENSHOT_PATH) {
        Ok(true) => println!("The images are equal."),
        Ok(false) => println!("The images are different."),
        Err(e) => {
            error!("{}", e);
            println!("❌ {}", e);
        }
    }
}

fn load_config(path: Option<&Path>) -> SpriteResult<LocatorConfig> {
    match path {
        Some(path) => Ok(LocatorConfig::load_toml(path)?),
        None => Ok(LocatorConfig::default()),
    }
}

fn init_pool(n_threads: usize) -> SpriteResult<()> {
    Ok(init_thread_pool(n_threads)?)
}

fn extract_sprite(config: LocatorConfig) -> SpriteResult<LocateOutcome> {
    let locator = SpriteLocator::new(config)?;
    Ok(locator.extract_sprite(DEFAULT_SCREENSHOT_PATH, DEFAULT_TEMPLATE_PATH, DEFAULT_OUTPUT_PATH)?)
}

fn images_equal(first: &str, second: &str) -> SpriteResult<bool> {
    Ok(compare_images(first, second)?)
}
