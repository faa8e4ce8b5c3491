use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Task;
use crate::repositories::tasks::{SubjectTaskRow, TaskRosterRow, TaskWithSubject};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TaskCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "subjectId")]
    #[validate(length(min = 1, message = "subject_id must not be empty"))]
    pub(crate) subject_id: String,
    #[serde(default)]
    #[serde(alias = "dueDate")]
    pub(crate) due_date: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TaskUpdate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "dueDate")]
    pub(crate) due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskListQuery {
    #[serde(default)]
    pub(crate) subject_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) subject_id: String,
    pub(crate) subject_name: Option<String>,
    pub(crate) class_id: i64,
    pub(crate) due_date: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl TaskResponse {
    pub(crate) fn from_joined(task: TaskWithSubject) -> Self {
        Self {
            id: task.id,
            name: task.name,
            description: task.description,
            subject_id: task.subject_id,
            subject_name: Some(task.subject_name),
            class_id: task.class_id,
            due_date: task.due_date,
            created_at: format_primitive(task.created_at),
            updated_at: format_primitive(task.updated_at),
        }
    }

    pub(crate) fn from_db(task: Task) -> Self {
        Self {
            id: task.id,
            name: task.name,
            description: task.description,
            subject_id: task.subject_id,
            subject_name: None,
            class_id: task.class_id,
            due_date: task.due_date,
            created_at: format_primitive(task.created_at),
            updated_at: format_primitive(task.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskCreatedResponse {
    pub(crate) message: String,
    pub(crate) task: TaskResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskGradesResponse {
    pub(crate) task: TaskResponse,
    pub(crate) students: Vec<TaskRosterRow>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskSummary {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) due_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectTasksResponse {
    pub(crate) subject_id: String,
    pub(crate) subject_name: String,
    pub(crate) tasks: Vec<TaskSummary>,
}

/// Regroups the flat subject/task join into one entry per subject, in the
/// row order the query produced.
pub(crate) fn group_tasks_by_subject(rows: Vec<SubjectTaskRow>) -> Vec<SubjectTasksResponse> {
    let mut grouped: Vec<SubjectTasksResponse> = Vec::new();

    for row in rows {
        if grouped.last().map(|entry| entry.subject_id != row.subject_id).unwrap_or(true) {
            grouped.push(SubjectTasksResponse {
                subject_id: row.subject_id.clone(),
                subject_name: row.subject_name.clone(),
                tasks: Vec::new(),
            });
        }

        if let (Some(id), Some(name)) = (row.task_id, row.task_name) {
            if let Some(entry) = grouped.last_mut() {
                entry.tasks.push(TaskSummary {
                    id,
                    name,
                    description: row.task_description,
                    due_date: row.due_date,
                });
            }
        }
    }

    grouped
}
