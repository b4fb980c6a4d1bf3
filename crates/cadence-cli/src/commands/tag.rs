use anyhow::Result;
use cadence_core::models::{NewTagData, UpdateTagData};
use cadence_core::repository::Repository;

use crate::cli::{TagCommand, TagSubcommand};
use crate::util::resolve_tag_id;
use crate::views::table::display_tags;

pub async fn tag_command(repo: &impl Repository, command: TagCommand) -> Result<()> {
    match command.command {
        TagSubcommand::Add(add) => {
            let tag = repo
                .add_tag(NewTagData {
                    name: add.name,
                    color: add.color,
                })
                .await?;
            println!("Added tag: {}", tag.name);
        }
        TagSubcommand::List => {
            let tags = repo.find_tags().await?;
            display_tags(&tags);
        }
        TagSubcommand::Edit(edit) => {
            let tag_id = resolve_tag_id(repo, &edit.name).await?;
            let tag = repo
                .update_tag(
                    tag_id,
                    UpdateTagData {
                        name: edit.rename,
                        color: edit.color,
                    },
                )
                .await?;
            println!("Updated tag: {}", tag.name);
        }
        TagSubcommand::Delete(delete) => {
            let tag_id = resolve_tag_id(repo, &delete.name).await?;
            repo.delete_tag(tag_id).await?;
            println!("Deleted tag: {}", delete.name);
        }
    }
    Ok(())
}
