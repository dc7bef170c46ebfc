//! Command dispatch for the `sundial` binary.
//!
//! Every command hydrates the caches it needs before acting, since the
//! process starts cold on each invocation. Output is plain lines on
//! stdout; notifications and logs go to stderr.

use anyhow::Context;
use chrono::NaiveDate;
use tracing::instrument;

use crate::cli::{CatAction, Command, TagAction};
use crate::http::HttpGateway;
use crate::model::{Task, TaskPayload};
use crate::store::{App, today};

#[instrument(skip(app, http, command))]
pub async fn dispatch(app: &mut App, http: &HttpGateway, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { username, password } => {
            http.login(&username, &password)
                .await
                .context("login failed")?;
            println!("logged in as {username}");
        }
        Command::Fetch => {
            app.initialize().await;
            let stats = app.tasks.stats(today());
            println!(
                "{} tasks cached ({} today, {} done, {} overdue), {} lists, {} tags",
                stats.total,
                stats.pending + stats.completed,
                stats.completed,
                stats.overdue,
                app.categories.all().len(),
                app.tags.all().len()
            );
        }
        Command::List { date } => cmd_list(app, date).await,
        Command::Add {
            title,
            description,
            category,
            priority,
            date,
            deadline,
            tags,
        } => {
            let payload = TaskPayload {
                title,
                description,
                category,
                priority_level: priority,
                scheduled_date: date.unwrap_or_else(today),
                dead_line: deadline,
                start_time: None,
                end_time: None,
                is_completed: false,
                tags,
                sub_tasks: vec![],
            };
            let id = app.create_task(payload).await?;
            println!("created task {id}");
        }
        Command::Done { id } => {
            app.fetch_all().await;
            let completed = app.toggle_completion(id).await?;
            if completed {
                println!("task {id} completed");
            } else {
                println!("task {id} reopened");
            }
        }
        Command::Rm { id } => {
            app.fetch_all().await;
            app.delete_task(id).await?;
            println!("deleted task {id}");
        }
        Command::Tag { action } => cmd_tag(app, action).await?,
        Command::Cat { action } => cmd_cat(app, action).await?,
    }
    Ok(())
}

async fn cmd_list(app: &mut App, date: Option<NaiveDate>) {
    app.fetch_all().await;
    match date {
        Some(date) => {
            app.fetch_by_date(date).await;
            let tasks = app.tasks.tasks_for_date(date);
            for task in tasks {
                println!("{}", format_task(task));
            }
            if tasks.is_empty() {
                println!("no tasks on {date}");
            }
        }
        None => {
            let now = today();
            let tasks = app.tasks.today(now);
            for task in &tasks {
                println!("{}", format_task(task));
            }
            if tasks.is_empty() {
                println!("nothing scheduled for today");
            }
        }
    }
}

async fn cmd_tag(app: &mut App, action: TagAction) -> anyhow::Result<()> {
    match action {
        TagAction::List => {
            app.fetch_tags().await;
            for tag in app.tags.all() {
                println!("{:>4}  {}", tag.id, tag.title);
            }
        }
        TagAction::Add { title } => {
            let id = app.create_tag(&title).await?;
            println!("created tag {id}");
        }
        TagAction::Rename { id, title } => {
            app.fetch_tags().await;
            app.rename_tag(id, &title).await?;
            println!("renamed tag {id}");
        }
        TagAction::Rm { id } => {
            app.fetch_tags().await;
            app.delete_tag(id).await?;
            println!("deleted tag {id}");
        }
    }
    Ok(())
}

async fn cmd_cat(app: &mut App, action: CatAction) -> anyhow::Result<()> {
    match action {
        CatAction::List => {
            app.fetch_all().await;
            app.fetch_categories().await;
            for cat in app.categories.all() {
                println!(
                    "{:>4}  {} ({} today)",
                    cat.id,
                    cat.title,
                    cat.task_count.unwrap_or(0)
                );
            }
        }
        CatAction::Add { title } => {
            let id = app.create_category(&title).await?;
            println!("created list {id}");
        }
        CatAction::Rename { id, title } => {
            app.fetch_categories().await;
            app.rename_category(id, &title).await?;
            println!("renamed list {id}");
        }
        CatAction::Rm { id } => {
            app.fetch_all().await;
            app.fetch_categories().await;
            app.delete_category(id).await?;
            println!("deleted list {id}");
        }
    }
    Ok(())
}

fn format_task(task: &Task) -> String {
    let mark = if task.is_completed { 'x' } else { ' ' };
    let mut line = format!(
        "{:>4} [{mark}] {} {} ({})",
        task.id,
        task.priority_level.as_letter(),
        task.title,
        task.scheduled_date
    );
    if let Some(deadline) = task.dead_line {
        line.push_str(&format!(" due {deadline}"));
    }
    if !task.tags.is_empty() {
        let tags: Vec<&str> = task.tags.iter().map(|tag| tag.title.as_str()).collect();
        line.push_str(&format!(" +{}", tags.join(" +")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Tag};
    use chrono::Utc;

    #[test]
    fn format_task_shows_state_deadline_and_tags() {
        let task = Task {
            id: 12,
            title: "Water the plants".to_string(),
            description: String::new(),
            category: None,
            priority_level: Priority::High,
            scheduled_date: "2024-06-01".parse().expect("date"),
            dead_line: Some("2024-06-03".parse().expect("date")),
            start_time: None,
            end_time: None,
            is_completed: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            sub_tasks: vec![],
            tags: vec![Tag {
                id: 1,
                title: "home".to_string(),
            }],
        };
        let line = format_task(&task);
        assert!(line.contains("[x]"));
        assert!(line.contains("H Water the plants"));
        assert!(line.contains("due 2024-06-03"));
        assert!(line.contains("+home"));
    }
}
