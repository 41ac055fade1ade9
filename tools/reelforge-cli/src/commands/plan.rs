//! Print the render plan of a manifest without rendering.

use std::path::PathBuf;

use reelforge_common::config::AppConfig;
use reelforge_project_model::Manifest;
use reelforge_render_engine::{plan_render, FfmpegEngine, RenderPlan};

pub fn run(config: &AppConfig, manifest: PathBuf, json: bool) -> anyhow::Result<()> {
    let loaded = Manifest::load(&manifest)
        .map_err(|e| anyhow::anyhow!("Failed to load manifest: {e}"))?;

    let (sections, missing) = match loaded {
        Manifest::Single(request) => {
            let missing = request.validate_sources();
            (vec![request], missing)
        }
        Manifest::Sectioned(request) => {
            let missing = request.validate_sources();
            (request.sections, missing)
        }
    };
    if !missing.is_empty() {
        eprintln!("Manifest issues:");
        for issue in &missing {
            eprintln!("  - {issue}");
        }
        anyhow::bail!("{} issue(s) found in {}", missing.len(), manifest.display());
    }

    let engine = FfmpegEngine::new(&config.engine);
    let plans = sections
        .iter()
        .map(|section| plan_render(section, &engine))
        .collect::<Result<Vec<RenderPlan>, _>>()
        .map_err(|e| anyhow::anyhow!("Planning failed: {e}"))?;

    if json {
        match plans.as_slice() {
            [single] => println!("{}", serde_json::to_string_pretty(single)?),
            many => println!("{}", serde_json::to_string_pretty(many)?),
        }
        return Ok(());
    }

    let sectioned = plans.len() > 1;
    for (n, plan) in plans.iter().enumerate() {
        if sectioned {
            println!("=== Section {} ===", n + 1);
        }
        print_plan(plan);
    }
    Ok(())
}

fn print_plan(plan: &RenderPlan) {
    println!(
        "Profile: {:?} {} @ {}fps",
        plan.profile.kind,
        plan.profile.frame_size(),
        plan.profile.fps
    );
    println!("Narration: {:.2}s", plan.narration.duration_secs);
    println!();

    println!("Segments:");
    println!(
        "  {:>3}  {:<6} {:>8} {:>10}  {:<7} Source",
        "#", "Kind", "Native", "Allocated", "Trimmed"
    );
    for seg in &plan.segments {
        let native = seg
            .native_duration_secs
            .map(|d| format!("{d:.2}s"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>3}  {:<6} {:>8} {:>9.2}s  {:<7} {}",
            seg.index,
            format!("{:?}", seg.kind),
            native,
            seg.allocated_duration_secs,
            if seg.trimmed { "yes" } else { "no" },
            seg.source_path.display()
        );
    }
    println!();

    let r = &plan.reconciliation;
    println!("Reconciliation:");
    println!("  Nominal per segment: {:.3}s", r.nominal_secs);
    println!("  Initial total: {:.3}s", r.initial_total_secs);
    println!("  Deficit: {:+.3}s", r.deficit_secs);
    println!("  Adjustment per image: {:+.3}s", r.adjustment_per_image_secs);
    println!("  Final total: {:.3}s", r.final_total_secs);
    if r.degenerate {
        println!(
            "  [WARN] Allocation diverges from narration by {:.3}s",
            r.divergence_secs()
        );
    }
    if !plan.classification.probe_failures.is_empty() {
        println!(
            "  [WARN] {} clip probe(s) failed, nominal duration used",
            plan.classification.probe_failures.len()
        );
    }
    println!();

    println!("Captions: {} word(s)", plan.words.len());
    println!();
    println!("Filter graph:");
    println!("{}", plan.graph.to_filter_complex());
    println!();
}
