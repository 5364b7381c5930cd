//! FFmpeg video filter generation.

use voxreel_models::FramePlan;

/// Render a frame plan as its crop (or downscale-then-crop) filter.
pub fn plan_filter(plan: &FramePlan) -> String {
    match *plan {
        FramePlan::Crop { out_w, out_h, x, y } => {
            format!("crop={}:{}:{}:{}", out_w, out_h, x, y)
        }
        FramePlan::ScaleCrop {
            scale_w,
            scale_h,
            out_w,
            out_h,
            x,
            y,
        } => format!(
            "scale={}:{},crop={}:{}:{}:{}",
            scale_w, scale_h, out_w, out_h, x, y
        ),
    }
}

/// Full per-segment chain: normalize, fit the composite canvas, then
/// reset the sample aspect so every input feeds the same concat.
///
/// All plans share the target display ratio, so the canvas scale is
/// distortion-free; it is skipped when the plan already lands on the
/// canvas size.
pub fn segment_chain(plan: &FramePlan, canvas_w: u32, canvas_h: u32) -> String {
    let mut chain = plan_filter(plan);
    if plan.out_w() != canvas_w || plan.out_h() != canvas_h {
        chain.push_str(&format!(",scale={}:{}", canvas_w, canvas_h));
    }
    chain.push_str(",setsar=1");
    chain
}

/// Build the full concat graph for a list of per-input filter chains.
///
/// Each chain is applied to `[i:v]`, labelled `[v{i}]`, and the labels
/// feed `concat=n=N:v=1:a=0[vout]`.
pub fn concat_filter(chains: &[String]) -> String {
    let mut graph = String::new();
    for (i, chain) in chains.iter().enumerate() {
        graph.push_str(&format!("[{}:v]{}[v{}];", i, chain, i));
    }
    for i in 0..chains.len() {
        graph.push_str(&format!("[v{}]", i));
    }
    graph.push_str(&format!("concat=n={}:v=1:a=0[vout]", chains.len()));
    graph
}
