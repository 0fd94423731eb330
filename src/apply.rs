use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    config::Config,
    engine::plan_automation,
    forge::{Forge, LabelRemoval},
    ledger::{reviewer_score, update_reviewer_score_ledger},
    project::{ProjectUpdate, build_project_mutation, plan_project_updates},
    types::{AutomationInput, EventContext, OutputPlan, PrSnapshot},
};

/// What happened to the PR's project board item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectSync {
    Updated(usize),
    UpToDate,
    NotOnBoard,
}

/// Gathers everything the planner needs for one event.
pub async fn collect_input<F>(
    forge: &F,
    config: &Config,
    event: EventContext,
) -> Result<AutomationInput>
where
    F: Forge + Sync,
{
    let data = forge
        .fetch_snapshot(
            &event.repo,
            event.issue_number,
            &config.project_owner,
            config.project_number,
        )
        .await?;

    let reviewer_logins = forge.team_members(&config.reviewer_team).await?;
    // Only review submissions can trigger auto-assignment.
    let maintainer_logins = match event.review_state {
        Some(_) => forge.team_members(&config.maintainer_team).await?,
        None => None,
    };

    let author_score = match data.author_login.as_deref() {
        Some(author) => {
            reviewer_score(
                forge,
                event.repo.owner(),
                config.ledger_project_number,
                author,
            )
            .await
        }
        None => 0,
    };

    Ok(AutomationInput {
        event,
        data,
        reviewer_logins,
        maintainer_logins,
        author_score,
    })
}

/// Pushes the planned board status and priority to the project item.
pub async fn sync_project_fields<F>(
    forge: &F,
    data: &PrSnapshot,
    config: &Config,
    status_label_to_sync: Option<&str>,
    priority: i64,
) -> Result<ProjectSync>
where
    F: Forge + Sync,
{
    let Some(project_id) = data.project_id.as_deref() else {
        bail!("Project ID not found for configured project");
    };
    let Some(item) = data.project_item.as_ref() else {
        info!("PR is not part of the project board, skipping project sync");
        return Ok(ProjectSync::NotOnBoard);
    };

    let field = |name: &str| {
        data.project_fields
            .iter()
            .find(|field| field.name == name)
            .with_context(|| format!("Could not find \"{name}\" field"))
    };
    let status_field = field(&config.status_field_name)?;
    let priority_field = field(&config.priority_field_name)?;

    let updates = plan_project_updates(
        &item.field_values,
        status_field,
        priority_field,
        &config.status_labels,
        status_label_to_sync,
        priority,
    )?;

    if updates.is_empty() {
        info!("Project fields already up to date");
        return Ok(ProjectSync::UpToDate);
    }

    for update in &updates {
        match update {
            ProjectUpdate::Status { option_id, .. } => {
                info!("Setting {} to option {option_id}", status_field.name)
            }
            ProjectUpdate::Priority { number, .. } => {
                info!("Setting {} to {number}", priority_field.name)
            }
        }
    }

    let mutation = build_project_mutation(project_id, &item.id, &updates);
    forge.update_project_fields(&mutation).await?;
    Ok(ProjectSync::Updated(updates.len()))
}

/// Applies a plan: labels first, then assignees, then the project board.
pub async fn apply_output<F>(
    forge: &F,
    input: &AutomationInput,
    config: &Config,
    plan: &OutputPlan,
) -> Result<()>
where
    F: Forge + Sync,
{
    let repo = &input.event.repo;
    let number = input.event.issue_number;
    let label_plan = &plan.label_plan;

    for label in &label_plan.labels_to_remove {
        info!("Removing label \"{label}\"");
        if forge.remove_label(repo, number, label).await? == LabelRemoval::NotPresent {
            debug!("Label \"{label}\" not found (404), skipping");
        }
    }

    if !label_plan.labels_to_add.is_empty() {
        let labels: Vec<String> = label_plan.labels_to_add.iter().cloned().collect();
        info!("Adding labels: {}", labels.join(", "));
        forge.add_labels(repo, number, &labels).await?;
    }

    let assignees = &input.data.assignees;
    if plan.should_unassign && !assignees.is_empty() {
        info!(
            "Unassigning stale review: removing {} assignee(s) from PR #{number}",
            assignees.len()
        );
        forge.remove_assignees(repo, number, assignees).await?;
    }

    if let Some(reviewer) = &plan.assign_reviewer {
        info!("Assigning {reviewer} to PR #{number}");
        forge
            .add_assignees(repo, number, std::slice::from_ref(reviewer))
            .await?;
    }

    sync_project_fields(
        forge,
        &input.data,
        config,
        label_plan.status_label_to_sync.as_deref(),
        plan.priority,
    )
    .await?;

    Ok(())
}

/// Runs the whole automation for one event and returns the plan that was
/// (or, with `dry_run`, would have been) applied.
pub async fn run<F>(
    forge: &F,
    config: &Config,
    event: EventContext,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<OutputPlan>
where
    F: Forge + Sync,
{
    let input = collect_input(forge, config, event).await?;

    if !dry_run {
        update_reviewer_score_ledger(
            forge,
            &input.event,
            config.ledger_project_number,
            input.reviewer_logins.as_ref(),
            &input.data.title,
        )
        .await;
    }

    let plan = plan_automation(&input, config, now)?;

    if dry_run {
        info!("Dry run, not applying changes");
    } else {
        apply_output(forge, &input, config, &plan).await?;
    }

    Ok(plan)
}
