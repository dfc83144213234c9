/*!
 * Common test utilities for the scenefit test suite
 */

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use scenefit::scene::{ProtectionInfo, ProtectionLevel, ProtectionStrategy, Scene};

/// Route library logs through env_logger; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Back-to-back scenes from `(duration, importance)` pairs, starting at zero
pub fn sequential(pairs: &[(f64, f64)]) -> Vec<Scene> {
    let mut start = 0.0;
    pairs.iter()
        .enumerate()
        .map(|(i, (duration, importance))| {
            let scene =
                Scene::with_duration(format!("s{}", i + 1), start, *duration).importance(*importance);
            start += duration;
            scene
        })
        .collect()
}

/// Deterministic generator so property checks are reproducible
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Random scene list: durations in `[0.5, 30)`, gaps up to 120ms, and a mix
/// of importance, protected tags and explicit protection strategies
pub fn random_scenes(rng: &mut StdRng, count: usize) -> Vec<Scene> {
    let mut start = 0.0;
    let mut scenes = Vec::with_capacity(count);
    for i in 0..count {
        let duration = rng.random_range(0.5..30.0);
        let mut scene = Scene::with_duration(format!("r{}", i), start, duration)
            .importance(rng.random_range(0.0..1.0));

        match rng.random_range(0..8) {
            0 => scene = scene.tag("climax"),
            1 => {
                scene = scene.protected(
                    ProtectionInfo::new(ProtectionLevel::High)
                        .with_strategy(ProtectionStrategy::NoTrim),
                )
            }
            2 => {
                scene = scene.protected(
                    ProtectionInfo::new(ProtectionLevel::None)
                        .with_strategy(ProtectionStrategy::NoCompress),
                )
            }
            _ => {}
        }

        let gap = if rng.random_bool(0.6) {
            rng.random_range(0.0..0.120)
        } else {
            0.0
        };
        start += duration + gap;
        scenes.push(scene);
    }
    scenes
}
