use anyhow::{Result, bail};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::{
    config::StatusLabels,
    types::{ProjectField, ProjectFieldValue, ProjectItemFieldValue},
};

/// A single field write on the PR's project board item.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectUpdate {
    Status { field_id: String, option_id: String },
    Priority { field_id: String, number: i64 },
}

/// A GraphQL mutation document together with its variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectMutation {
    pub query: String,
    pub variables: Map<String, Value>,
}

impl ProjectMutation {
    /// Request body in the shape `octocrab.graphql` expects.
    pub fn to_request(&self) -> Value {
        json!({
            "query": self.query,
            "variables": self.variables,
        })
    }
}

fn current_value<'a>(
    item_fields: &'a [ProjectItemFieldValue],
    field_name: &str,
) -> Option<&'a ProjectFieldValue> {
    item_fields
        .iter()
        .find(|value| value.field_name == field_name)
        .map(|value| &value.value)
}

/// Works out which board fields differ from what the PR should show.
///
/// Fails when the status label maps to a board column that the status
/// field has no option for.
pub fn plan_project_updates(
    item_fields: &[ProjectItemFieldValue],
    status_field: &ProjectField,
    priority_field: &ProjectField,
    status_labels: &StatusLabels,
    status_label_to_sync: Option<&str>,
    priority: i64,
) -> Result<Vec<ProjectUpdate>> {
    let mut updates = Vec::new();

    if let Some(status_name) = status_label_to_sync.and_then(|label| status_labels.board_name(label))
    {
        let Some(option) = status_field
            .options
            .iter()
            .find(|option| option.name == status_name)
        else {
            bail!("\"{status_name}\" is not a valid option");
        };

        let current = match current_value(item_fields, &status_field.name) {
            Some(ProjectFieldValue::SingleSelect(name)) => name.as_deref(),
            _ => None,
        };
        debug!(
            current = current.unwrap_or("none"),
            target = status_name,
            "Comparing board status"
        );
        if current != Some(status_name) {
            updates.push(ProjectUpdate::Status {
                field_id: status_field.id.clone(),
                option_id: option.id.clone(),
            });
        }
    }

    let current_priority = match current_value(item_fields, &priority_field.name) {
        Some(ProjectFieldValue::Number(number)) => *number,
        _ => None,
    };
    if current_priority != Some(priority as f64) {
        updates.push(ProjectUpdate::Priority {
            field_id: priority_field.id.clone(),
            number: priority,
        });
    }

    Ok(updates)
}

/// Builds one mutation with an aliased `updateProjectV2ItemFieldValue`
/// per update, all values passed as variables.
pub fn build_project_mutation(
    project_id: &str,
    item_id: &str,
    updates: &[ProjectUpdate],
) -> ProjectMutation {
    let mut variables = Map::new();
    variables.insert("projectId".to_string(), json!(project_id));
    variables.insert("itemId".to_string(), json!(item_id));
    let mut variable_defs = vec!["$projectId: ID!".to_string(), "$itemId: ID!".to_string()];
    let mut parts = Vec::with_capacity(updates.len());

    for (index, update) in updates.iter().enumerate() {
        let (field_var, value_var, value_type, value_key) = match update {
            ProjectUpdate::Status {
                field_id,
                option_id,
            } => {
                let field_var = format!("statusFieldId{index}");
                let value_var = format!("statusOptionId{index}");
                variables.insert(field_var.clone(), json!(field_id));
                variables.insert(value_var.clone(), json!(option_id));
                (field_var, value_var, "String!", "singleSelectOptionId")
            }
            ProjectUpdate::Priority { field_id, number } => {
                let field_var = format!("priorityFieldId{index}");
                let value_var = format!("priorityNumber{index}");
                variables.insert(field_var.clone(), json!(field_id));
                variables.insert(value_var.clone(), json!(*number as f64));
                (field_var, value_var, "Float!", "number")
            }
        };
        variable_defs.push(format!("${field_var}: ID!"));
        variable_defs.push(format!("${value_var}: {value_type}"));
        parts.push(format!(
            r#"
                update{index}: updateProjectV2ItemFieldValue(
                    input: {{
                        projectId: $projectId
                        itemId: $itemId
                        fieldId: ${field_var}
                        value: {{ {value_key}: ${value_var} }}
                    }}
                ) {{
                    projectV2Item {{
                        id
                    }}
                }}"#
        ));
    }

    let query = format!(
        "mutation({}) {{{}\n}}",
        variable_defs.join(", "),
        parts.join("")
    );

    ProjectMutation { query, variables }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProjectFieldOption;

    fn status_field() -> ProjectField {
        ProjectField {
            id: "status-field".to_string(),
            name: "Status".to_string(),
            options: ["Needs Review", "Needs Changes", "Awaiting Merge"]
                .iter()
                .enumerate()
                .map(|(i, name)| ProjectFieldOption {
                    id: format!("opt-{i}"),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    fn priority_field() -> ProjectField {
        ProjectField {
            id: "priority-field".to_string(),
            name: "Priority".to_string(),
            options: Vec::new(),
        }
    }

    fn item_fields(status: Option<&str>, priority: Option<f64>) -> Vec<ProjectItemFieldValue> {
        vec![
            ProjectItemFieldValue {
                field_id: "status-field".to_string(),
                field_name: "Status".to_string(),
                value: ProjectFieldValue::SingleSelect(status.map(str::to_string)),
            },
            ProjectItemFieldValue {
                field_id: "priority-field".to_string(),
                field_name: "Priority".to_string(),
                value: ProjectFieldValue::Number(priority),
            },
        ]
    }

    #[test]
    fn test_up_to_date_item_needs_no_updates() {
        let updates = plan_project_updates(
            &item_fields(Some("Needs Review"), Some(94.0)),
            &status_field(),
            &priority_field(),
            &StatusLabels::default(),
            Some("status:needs-review"),
            94,
        )
        .unwrap();
        assert!(updates.is_empty());
    }

    #[test]
    fn test_changed_status_and_priority() {
        let updates = plan_project_updates(
            &item_fields(Some("Needs Review"), None),
            &status_field(),
            &priority_field(),
            &StatusLabels::default(),
            Some("status:awaiting-merge"),
            200,
        )
        .unwrap();
        assert_eq!(
            updates,
            vec![
                ProjectUpdate::Status {
                    field_id: "status-field".to_string(),
                    option_id: "opt-2".to_string(),
                },
                ProjectUpdate::Priority {
                    field_id: "priority-field".to_string(),
                    number: 200,
                },
            ]
        );
    }

    #[test]
    fn test_unmapped_status_label_only_syncs_priority() {
        let updates = plan_project_updates(
            &[],
            &status_field(),
            &priority_field(),
            &StatusLabels::default(),
            Some("bug"),
            10,
        )
        .unwrap();
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], ProjectUpdate::Priority { number: 10, .. }));
    }

    #[test]
    fn test_missing_board_option_fails() {
        let err = plan_project_updates(
            &[],
            &status_field(),
            &priority_field(),
            &StatusLabels::default(),
            Some("status:needs-decision"),
            10,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "\"Needs Decision\" is not a valid option");
    }

    #[test]
    fn test_build_project_mutation() {
        let mutation = build_project_mutation(
            "project-1",
            "item-1",
            &[
                ProjectUpdate::Status {
                    field_id: "status-field".to_string(),
                    option_id: "opt-2".to_string(),
                },
                ProjectUpdate::Priority {
                    field_id: "priority-field".to_string(),
                    number: 42,
                },
            ],
        );

        assert!(mutation.query.starts_with(
            "mutation($projectId: ID!, $itemId: ID!, $statusFieldId0: ID!, \
             $statusOptionId0: String!, $priorityFieldId1: ID!, $priorityNumber1: Float!)"
        ));
        assert!(mutation.query.contains("update0: updateProjectV2ItemFieldValue("));
        assert!(mutation.query.contains("value: { singleSelectOptionId: $statusOptionId0 }"));
        assert!(mutation.query.contains("update1: updateProjectV2ItemFieldValue("));
        assert!(mutation.query.contains("value: { number: $priorityNumber1 }"));

        let request = mutation.to_request();
        assert_eq!(request["variables"]["projectId"], "project-1");
        assert_eq!(request["variables"]["itemId"], "item-1");
        assert_eq!(request["variables"]["statusOptionId0"], "opt-2");
        assert_eq!(request["variables"]["priorityFieldId1"], "priority-field");
        assert_eq!(request["variables"]["priorityNumber1"], 42.0);
    }
}
