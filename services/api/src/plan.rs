use crate::infra::{load_fixture, Fixture};
use clap::Args;
use linkdesk::error::AppError;
use linkdesk::workflows::assignment::{
    AssignmentConfig, AssignmentPlanner, AssignmentSession, SessionView,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct PlanArgs {
    /// JSON fixture with `line_items` and `domains`
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Override the minimum evidence score accepted ahead of fallback
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub(crate) threshold: Option<u8>,
    /// Print the plans as JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_plan(args: PlanArgs) -> Result<(), AppError> {
    let fixture = load_fixture(&args.input)?;
    let mut config = AssignmentConfig::default();
    if let Some(threshold) = args.threshold {
        config.best_available_threshold = threshold;
    }

    let views = plan_fixture(&fixture, config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&views)?);
    } else {
        for view in &views {
            print!("{}", render_plan(view));
        }
    }
    Ok(())
}

/// Plans every order in the fixture against the full domain pool.
pub(crate) fn plan_fixture(
    fixture: &Fixture,
    config: AssignmentConfig,
) -> Result<Vec<SessionView>, AppError> {
    let planner = AssignmentPlanner::new(config);
    fixture
        .orders()
        .into_iter()
        .map(|(order_id, line_items)| {
            let mut session = AssignmentSession::new(
                order_id,
                fixture.domains.clone(),
                line_items,
                planner.clone(),
            )?;
            session.regenerate();
            Ok(SessionView::of(&session))
        })
        .collect()
}

pub(crate) fn render_plan(view: &SessionView) -> String {
    let mut out = format!("Order {}\n", view.order_id);
    for suggestion in &view.suggestions {
        out.push_str(&format!(
            "- {} -> {} [{} {}] {} ({})\n",
            suggestion.line_item_id,
            suggestion.domain_id,
            suggestion.confidence.label(),
            suggestion.score,
            suggestion.reasoning,
            suggestion.evidence_preview
        ));
    }
    for line_item in &view.unassigned_line_items {
        out.push_str(&format!("- {line_item} -> unassigned\n"));
    }
    out.push_str(&format!("Summary: {}\n\n", view.stats.summary()));
    out
}
