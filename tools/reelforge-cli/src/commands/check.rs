//! Check the media engine and caption fonts.

use std::path::Path;

use anyhow::Context;
use reelforge_captions::FontChoice;
use reelforge_common::config::AppConfig;
use reelforge_render_engine::{FfmpegEngine, MediaEngine};

const USER_AGENT: &str = concat!("reelforge/", env!("CARGO_PKG_VERSION"));

pub async fn run(config: &AppConfig, fetch_fonts: bool, write_config: bool) -> anyhow::Result<()> {
    println!("ReelForge System Check");
    println!("{}", "=".repeat(50));

    let config_path = AppConfig::path();
    if config_path.exists() {
        match AppConfig::load_from(&config_path) {
            Ok(_) => println!("[OK] Config: {}", config_path.display()),
            Err(e) => println!("[WARN] {e} (defaults in use)"),
        }
    } else {
        println!("[OK] Config: defaults ({} not present)", config_path.display());
    }

    let engine = FfmpegEngine::new(&config.engine);
    let engine_ok = engine.is_available();
    if engine_ok {
        println!(
            "[OK] Media engine: {} ({} / {})",
            engine.name(),
            config.engine.ffmpeg,
            config.engine.ffprobe
        );
    } else {
        println!(
            "[FAIL] Media engine: '{}' or '{}' not found in PATH",
            config.engine.ffmpeg, config.engine.ffprobe
        );
    }

    let fonts_dir = config.captions.fonts_dir.as_path();
    if fetch_fonts {
        let installed = fetch_missing_fonts(fonts_dir).await?;
        println!("     Fetched {installed} font(s)");
    }

    if fonts_dir.is_dir() {
        println!("[OK] Fonts directory: {}", fonts_dir.display());
    } else {
        println!("[WARN] Fonts directory missing: {}", fonts_dir.display());
    }

    for font in FontChoice::CATALOG {
        let status = if font.is_available(Some(fonts_dir)) { "OK" } else { "WARN" };
        match font.file {
            Some(file) => println!("     [{status}] {} ({file})", font.family),
            None => println!("     [{status}] {} (system)", font.family),
        }
    }

    println!("[OK] Work root: {}", config.work_root.display());
    println!("     Words per cue: {}", config.captions.words_per_cue);

    if write_config {
        let path = config.save()?;
        println!("[OK] Wrote config: {}", path.display());
    }

    println!();
    if engine_ok {
        println!("All required capabilities are available. ReelForge is ready.");
    } else {
        println!("The media engine is missing. Install ffmpeg (with ffprobe) and retry.");
    }

    Ok(())
}

/// Download every catalog font not yet in `fonts_dir`. A failed font is
/// reported and skipped; returns how many were installed.
async fn fetch_missing_fonts(fonts_dir: &Path) -> anyhow::Result<usize> {
    let missing = FontChoice::missing(fonts_dir);
    if missing.is_empty() {
        return Ok(0);
    }

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")?;

    let mut installed = 0;
    for font in missing {
        let Some(url) = font.download_url() else {
            continue;
        };
        tracing::info!(family = font.family, url = %url, "Downloading caption font");
        match download(&client, &url).await {
            Ok(bytes) => match font.install(fonts_dir, &bytes) {
                Ok(_) => {
                    println!("     [OK] Downloaded {}", font.family);
                    installed += 1;
                }
                Err(e) => println!("     [FAIL] {}: {e}", font.family),
            },
            Err(e) => {
                tracing::warn!(family = font.family, error = %e, "Font download failed");
                println!("     [FAIL] {}: {e:#}", font.family);
            }
        }
    }
    Ok(installed)
}

async fn download(client: &reqwest::Client, url: &str) -> anyhow::Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?
        .error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}
