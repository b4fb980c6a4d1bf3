use anyhow::Result;
use cadence_core::models::{NewProjectData, UpdateProjectData};
use cadence_core::repository::Repository;

use crate::cli::{AddProjectCommand, ArchiveProjectCommand, EditProjectCommand, ProjectCommand, ProjectSubcommand};
use crate::util::resolve_project_id;
use crate::views::table::display_projects;

pub async fn project_command(repo: &impl Repository, command: ProjectCommand) -> Result<()> {
    match command.command {
        ProjectSubcommand::Add(add_command) => add_project(repo, add_command).await,
        ProjectSubcommand::List => list_projects(repo).await,
        ProjectSubcommand::Edit(edit_command) => edit_project(repo, edit_command).await,
        ProjectSubcommand::Archive(archive_command) => archive_project(repo, archive_command).await,
    }
}

async fn add_project(repo: &impl Repository, command: AddProjectCommand) -> Result<()> {
    let project = repo
        .add_project(NewProjectData {
            name: command.name,
            color: command.color,
            description: command.description,
        })
        .await?;
    println!("Added project: {}", project.name);
    Ok(())
}

async fn list_projects(repo: &impl Repository) -> Result<()> {
    let projects = repo.find_projects().await?;
    display_projects(&projects);
    Ok(())
}

async fn edit_project(repo: &impl Repository, command: EditProjectCommand) -> Result<()> {
    let project_id = resolve_project_id(repo, &command.name).await?;
    let description = if command.description_clear {
        Some(None)
    } else {
        command.description.map(Some)
    };
    let project = repo
        .update_project(
            project_id,
            UpdateProjectData {
                name: command.rename,
                color: command.color,
                description,
            },
        )
        .await?;
    println!("Updated project: {}", project.name);
    Ok(())
}

async fn archive_project(repo: &impl Repository, command: ArchiveProjectCommand) -> Result<()> {
    let project_id = resolve_project_id(repo, &command.name).await?;
    repo.archive_project(project_id).await?;
    println!("Archived project: {}", command.name);
    Ok(())
}
