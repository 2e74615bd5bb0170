//! Turns CLI options into a ready-to-run configuration.

use crate::assets;
use crate::RunOptions;
use anyhow::{Context, Result};
use probe_core::{Config, Credentials, HttpTransport, ScenarioContext};
use tracing::{debug, warn};

/// Effective configuration: file, then `PROBE_BASE_URL`, then flags.
pub fn load_config(options: &RunOptions) -> Result<Config> {
    let mut config = Config::load(&options.config)
        .with_context(|| format!("loading {}", options.config.display()))?;
    config.apply_env();
    apply_flags(&mut config, options);
    config.validate()?;
    debug!(?config, "effective configuration");
    Ok(config)
}

fn apply_flags(config: &mut Config, options: &RunOptions) {
    if let Some(base_url) = &options.base_url {
        config.api.base_url = base_url.clone();
    }
    if let Some(images_dir) = &options.images_dir {
        config.assets.images_dir = images_dir.clone();
    }
    if let Some(interval) = options.poll_interval {
        config.poll.interval_secs = interval;
    }
    if let Some(max_attempts) = options.max_attempts {
        config.poll.max_attempts = max_attempts;
    }
}

pub fn transport(config: &Config) -> Result<HttpTransport> {
    Ok(HttpTransport::new(
        &config.api.base_url,
        &config.api.prefix,
        config.api.request_timeout(),
    )?)
}

/// Fresh per-run context: a unique account plus the first image found.
pub fn context(config: &Config) -> Result<ScenarioContext> {
    let user = &config.user;
    let credentials =
        Credentials::unique(&user.email_prefix, &user.email_domain, &user.password, &user.name);
    let ctx = ScenarioContext::new(credentials);

    match assets::find_image(&config.assets.images_dir)? {
        Some(image) => {
            debug!(file = %image.file_name, bytes = image.bytes.len(), "loaded floor plan image");
            Ok(ctx.with_image(image))
        }
        None => {
            warn!(
                dir = %config.assets.images_dir.display(),
                "no .jpg/.png image found; upload and recognition steps will be skipped"
            );
            Ok(ctx)
        }
    }
}
