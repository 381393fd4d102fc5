//! Batched loading of the one-to-one refs embedded in responses.
//!
//! Each loader issues one `IN` query per relation regardless of how many
//! rows are being shaped.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::database::models::{
    from_row, AccessRequest, Decision, Kaizen, Meeting, Project, ProjectMember, ProjectRef, Sprint, SprintRef, TagRef,
    Task, TimeLog, UserRef,
};
use crate::database::{DataStore, Query, StoreError};

async fn load_refs<R: DeserializeOwned>(
    store: &dyn DataStore,
    table: &str,
    tenant_id: Option<Uuid>,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, R>, StoreError> {
    let ids: BTreeSet<Uuid> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query = Query::from(table).in_list("id", ids.iter().map(|id| id.to_string()));
    if let Some(tenant_id) = tenant_id {
        query = query.eq("tenant_id", tenant_id.to_string());
    }

    let mut refs = HashMap::with_capacity(ids.len());
    for row in store.select(&query).await? {
        let Some(id) = row.get("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok()) else {
            continue;
        };
        let value = from_row::<R>(row).map_err(|e| StoreError::RowFormat(e.to_string()))?;
        refs.insert(id, value);
    }
    Ok(refs)
}

pub async fn project_refs(
    store: &dyn DataStore,
    tenant_id: Uuid,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, ProjectRef>, StoreError> {
    load_refs(store, "projects", Some(tenant_id), ids).await
}

pub async fn sprint_refs(
    store: &dyn DataStore,
    tenant_id: Uuid,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, SprintRef>, StoreError> {
    load_refs(store, "sprints", Some(tenant_id), ids).await
}

/// Users of the tenant only; refs to anyone else resolve to nothing
pub async fn user_refs(
    store: &dyn DataStore,
    tenant_id: Uuid,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, UserRef>, StoreError> {
    load_refs(store, "users", Some(tenant_id), ids).await
}

/// Tags per task, via `task_tags`
pub async fn task_tags(
    store: &dyn DataStore,
    tenant_id: Uuid,
    task_ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, Vec<TagRef>>, StoreError> {
    let task_ids: BTreeSet<Uuid> = task_ids.into_iter().collect();
    if task_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let links = store
        .select(&Query::from("task_tags").in_list("task_id", task_ids.iter().map(|id| id.to_string())))
        .await?;
    let pairs: Vec<(Uuid, Uuid)> = links
        .iter()
        .filter_map(|row| {
            let task = row.get("task_id")?.as_str().and_then(|s| Uuid::parse_str(s).ok())?;
            let tag = row.get("tag_id")?.as_str().and_then(|s| Uuid::parse_str(s).ok())?;
            Some((task, tag))
        })
        .collect();

    let tags: HashMap<Uuid, TagRef> = load_refs(store, "tags", Some(tenant_id), pairs.iter().map(|(_, tag)| *tag)).await?;

    let mut by_task: HashMap<Uuid, Vec<TagRef>> = HashMap::new();
    for (task, tag) in pairs {
        if let Some(tag) = tags.get(&tag) {
            by_task.entry(task).or_default().push(tag.clone());
        }
    }
    for list in by_task.values_mut() {
        list.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok(by_task)
}

pub async fn attach_tasks(store: &dyn DataStore, tenant_id: Uuid, tasks: &mut [Task]) -> Result<(), StoreError> {
    let (projects, sprints, users, mut tags) = futures::try_join!(
        project_refs(store, tenant_id, tasks.iter().filter_map(|t| t.project_id)),
        sprint_refs(store, tenant_id, tasks.iter().filter_map(|t| t.sprint_id)),
        user_refs(store, tenant_id, tasks.iter().filter_map(|t| t.assignee_id)),
        task_tags(store, tenant_id, tasks.iter().map(|t| t.id)),
    )?;

    for task in tasks.iter_mut() {
        task.project = task.project_id.and_then(|id| projects.get(&id).cloned());
        task.sprint = task.sprint_id.and_then(|id| sprints.get(&id).cloned());
        task.assignee = task.assignee_id.and_then(|id| users.get(&id).cloned());
        task.tags = tags.remove(&task.id).unwrap_or_default();
    }
    Ok(())
}

pub async fn attach_projects(store: &dyn DataStore, tenant_id: Uuid, projects: &mut [Project]) -> Result<(), StoreError> {
    let owners = user_refs(store, tenant_id, projects.iter().filter_map(|p| p.owner_id)).await?;
    for project in projects.iter_mut() {
        project.owner = project.owner_id.and_then(|id| owners.get(&id).cloned());
    }
    Ok(())
}

pub async fn attach_sprints(store: &dyn DataStore, tenant_id: Uuid, sprints: &mut [Sprint]) -> Result<(), StoreError> {
    let projects = project_refs(store, tenant_id, sprints.iter().filter_map(|s| s.project_id)).await?;
    for sprint in sprints.iter_mut() {
        sprint.project = sprint.project_id.and_then(|id| projects.get(&id).cloned());
    }
    Ok(())
}

pub async fn attach_decisions(store: &dyn DataStore, tenant_id: Uuid, decisions: &mut [Decision]) -> Result<(), StoreError> {
    let projects = project_refs(store, tenant_id, decisions.iter().filter_map(|d| d.related_project_id)).await?;
    for decision in decisions.iter_mut() {
        decision.related_project = decision.related_project_id.and_then(|id| projects.get(&id).cloned());
    }
    Ok(())
}

pub async fn attach_kaizens(store: &dyn DataStore, tenant_id: Uuid, kaizens: &mut [Kaizen]) -> Result<(), StoreError> {
    let (projects, users) = futures::try_join!(
        project_refs(store, tenant_id, kaizens.iter().filter_map(|k| k.project_id)),
        user_refs(store, tenant_id, kaizens.iter().filter_map(|k| k.responsible_id)),
    )?;
    for kaizen in kaizens.iter_mut() {
        kaizen.project = kaizen.project_id.and_then(|id| projects.get(&id).cloned());
        kaizen.responsible = kaizen.responsible_id.and_then(|id| users.get(&id).cloned());
    }
    Ok(())
}

pub async fn attach_meetings(store: &dyn DataStore, tenant_id: Uuid, meetings: &mut [Meeting]) -> Result<(), StoreError> {
    let projects = project_refs(store, tenant_id, meetings.iter().filter_map(|m| m.project_id)).await?;
    for meeting in meetings.iter_mut() {
        meeting.project = meeting.project_id.and_then(|id| projects.get(&id).cloned());
    }
    Ok(())
}

pub async fn attach_time_logs(store: &dyn DataStore, tenant_id: Uuid, logs: &mut [TimeLog]) -> Result<(), StoreError> {
    let users = user_refs(store, tenant_id, logs.iter().map(|l| l.user_id)).await?;
    for log in logs.iter_mut() {
        log.user = users.get(&log.user_id).cloned();
    }
    Ok(())
}

pub async fn attach_members(store: &dyn DataStore, tenant_id: Uuid, members: &mut [ProjectMember]) -> Result<(), StoreError> {
    let users = user_refs(store, tenant_id, members.iter().map(|m| m.user_id)).await?;
    for member in members.iter_mut() {
        member.user = users.get(&member.user_id).cloned();
    }
    Ok(())
}

/// Requesters do not belong to the tenant yet, so this lookup is unscoped
pub async fn attach_requesters(store: &dyn DataStore, requests: &mut [AccessRequest]) -> Result<(), StoreError> {
    let users: HashMap<Uuid, UserRef> = load_refs(store, "users", None, requests.iter().map(|r| r.user_id)).await?;
    for request in requests.iter_mut() {
        request.user = users.get(&request.user_id).cloned();
    }
    Ok(())
}
