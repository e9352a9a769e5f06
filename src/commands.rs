//! Command-line subcommands and their dispatch.

use clap::{Args, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::api::types::{BlogInput, ContactInput, ExperienceInput, ProjectInput, SkillInput};
use crate::api::{ApiResponse, FilePart, Transport};
use crate::app::AppContext;
use crate::auth::Decision;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Log in and store the credential
  Login {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
  },
  /// Clear the credential, the session and the cache
  Logout,
  /// Show the current session
  Whoami,
  /// Run the route guard for a path and print its decision
  Navigate { path: String },
  /// Counts of projects, blogs, experiences and skills
  Stats,
  /// Manage blog posts
  #[command(subcommand)]
  Blog(BlogCommand),
  /// Manage projects
  #[command(subcommand)]
  Project(ProjectCommand),
  /// Manage skills
  #[command(subcommand)]
  Skill(SkillCommand),
  /// Manage work experience
  #[command(subcommand)]
  Experience(ExperienceCommand),
  /// Manage contact messages
  #[command(subcommand)]
  Contact(ContactCommand),
}

#[derive(Subcommand, Debug)]
pub enum BlogCommand {
  List,
  Get {
    id: String,
  },
  Create {
    #[arg(long)]
    title: String,
    /// File holding the post body (HTML)
    #[arg(long)]
    content_file: PathBuf,
    #[arg(long)]
    thumbnail: PathBuf,
  },
  Update {
    id: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    content_file: PathBuf,
    #[arg(long)]
    thumbnail: Option<PathBuf>,
  },
  Delete {
    id: String,
  },
  /// Upload an image for use inside a post and print its URL
  UploadImage {
    image: PathBuf,
  },
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
  #[arg(long)]
  title: String,
  #[arg(long)]
  description: String,
  /// Repeat for each technology
  #[arg(long = "tech")]
  technology: Vec<String>,
  #[arg(long, default_value = "")]
  duration: String,
  #[arg(long, default_value = "")]
  live_url: String,
  #[arg(long, default_value = "")]
  backend_repo_url: String,
  #[arg(long, default_value = "")]
  frontend_repo_url: String,
  #[arg(long)]
  image: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
  List,
  Get {
    id: String,
  },
  Create(ProjectArgs),
  Update {
    id: String,
    #[command(flatten)]
    fields: ProjectArgs,
  },
  Delete {
    id: String,
  },
}

#[derive(Subcommand, Debug)]
pub enum SkillCommand {
  List,
  Get {
    id: String,
  },
  Create {
    #[arg(long)]
    name: String,
    #[arg(long)]
    icon: PathBuf,
  },
  Update {
    id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    icon: Option<PathBuf>,
  },
  Delete {
    id: String,
  },
}

#[derive(Args, Debug)]
pub struct ExperienceArgs {
  #[arg(long)]
  company: String,
  #[arg(long)]
  position: String,
  /// YYYY-MM-DD
  #[arg(long)]
  start_date: String,
  /// YYYY-MM-DD
  #[arg(long)]
  end_date: String,
  #[arg(long)]
  description: String,
}

#[derive(Subcommand, Debug)]
pub enum ExperienceCommand {
  List,
  Get {
    id: String,
  },
  Create(ExperienceArgs),
  Update {
    id: String,
    #[command(flatten)]
    fields: ExperienceArgs,
  },
  Delete {
    id: String,
  },
}

#[derive(Subcommand, Debug)]
pub enum ContactCommand {
  List,
  Add {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    message: String,
  },
  Delete {
    id: String,
  },
}

/// Run one command against the application context.
pub async fn dispatch<T: Transport>(command: Command, app: &mut AppContext<T>) -> Result<()> {
  match command {
    Command::Login { email, password } => {
      let claim = app.login(&email, &password).await?;
      println!("Logged in as {} ({})", claim.email, claim.role);
    }
    Command::Logout => {
      app.logout()?;
      println!("Logged out");
    }
    Command::Whoami => whoami(app),
    Command::Navigate { path } => navigate(app, &path),
    Command::Stats => {
      ensure_access(app, "/dashboard")?;
      let stats = app.dashboard_stats().await?;
      println!("Projects:    {}", stats.projects);
      println!("Blogs:       {}", stats.blogs);
      println!("Experiences: {}", stats.experiences);
      println!("Skills:      {}", stats.skills);
    }
    Command::Blog(cmd) => {
      ensure_access(app, "/dashboard/admin/blog")?;
      blog(app, cmd).await?;
    }
    Command::Project(cmd) => {
      ensure_access(app, "/dashboard/admin/project")?;
      project(app, cmd).await?;
    }
    Command::Skill(cmd) => {
      ensure_access(app, "/dashboard/admin/skill")?;
      skill(app, cmd).await?;
    }
    Command::Experience(cmd) => {
      ensure_access(app, "/dashboard/admin/experience")?;
      experience(app, cmd).await?;
    }
    Command::Contact(cmd) => {
      ensure_access(app, "/dashboard/admin/contact")?;
      contact(app, cmd).await?;
    }
  }
  Ok(())
}

fn whoami<T: Transport>(app: &AppContext<T>) {
  let Some(user) = app.current_user() else {
    println!("Not logged in");
    return;
  };
  println!("{} ({})", user.email, user.role);
  println!("id: {}", user.id);
  if let Some(iat) = user.issued_at() {
    println!("issued: {}", iat.to_rfc3339());
  }
  if let Some(exp) = user.expires_at() {
    let note = if user.is_expired() { " (expired)" } else { "" };
    println!("expires: {}{}", exp.to_rfc3339(), note);
  }
}

fn navigate<T: Transport>(app: &AppContext<T>, path: &str) {
  match app.navigate(path) {
    None => println!("{}: not guarded", path),
    Some(verdict) if verdict.is_allowed() => {
      let who = verdict
        .claim
        .as_ref()
        .map(|claim| format!(" as {}", claim.email))
        .unwrap_or_default();
      println!("{}: allowed{} ({:?})", path, who, verdict.state);
    }
    Some(verdict) => {
      if let Decision::Redirect {
        location,
        clear_credential,
      } = &verdict.decision
      {
        let note = if *clear_credential {
          ", credential cleared"
        } else {
          ""
        };
        println!("{}: redirect to {} ({:?}{})", path, location, verdict.state, note);
      }
    }
  }
}

/// Gate a dashboard command the way the dashboard pages are gated.
fn ensure_access<T: Transport>(app: &AppContext<T>, path: &str) -> Result<()> {
  let Some(verdict) = app.navigate(path) else {
    return Ok(());
  };
  match verdict.decision {
    Decision::Allow => Ok(()),
    Decision::Redirect { location, .. } => Err(eyre!(
      "Access to {} denied, log in first (redirected to {})",
      path,
      location
    )),
  }
}

async fn blog<T: Transport>(app: &mut AppContext<T>, cmd: BlogCommand) -> Result<()> {
  match cmd {
    BlogCommand::List => {
      let def = app.api.blog.all_blogs();
      for post in app.fetch(def).await?.iter() {
        println!("{}  {}", post.id, post.title);
      }
    }
    BlogCommand::Get { id } => {
      let def = app.api.blog.blog(&id)?;
      print_json(&*app.fetch(def).await?)?;
    }
    BlogCommand::Create {
      title,
      content_file,
      thumbnail,
    } => {
      let input = BlogInput {
        title,
        content: read_text(&content_file).await?,
        thumbnail: Some(read_file(&thumbnail).await?),
      };
      let mutation = app.api.blog.add_blog(input)?;
      print_message(&app.mutate(mutation).await?);
    }
    BlogCommand::Update {
      id,
      title,
      content_file,
      thumbnail,
    } => {
      let input = BlogInput {
        title,
        content: read_text(&content_file).await?,
        thumbnail: read_optional_file(thumbnail.as_deref()).await?,
      };
      let mutation = app.api.blog.update_blog(&id, input)?;
      print_message(&app.mutate(mutation).await?);
    }
    BlogCommand::Delete { id } => {
      let mutation = app.api.blog.delete_blog(&id)?;
      print_message(&app.mutate(mutation).await?);
    }
    BlogCommand::UploadImage { image } => {
      let mutation = app.api.blog.editor_upload(read_file(&image).await?);
      let response = app.mutate(mutation).await?;
      println!("{}", response.data.url());
    }
  }
  Ok(())
}

async fn project<T: Transport>(app: &mut AppContext<T>, cmd: ProjectCommand) -> Result<()> {
  match cmd {
    ProjectCommand::List => {
      let def = app.api.project.all_projects();
      for project in app.fetch(def).await?.iter() {
        println!("{}  {}", project.id, project.title);
      }
    }
    ProjectCommand::Get { id } => {
      let def = app.api.project.project(&id)?;
      print_json(&*app.fetch(def).await?)?;
    }
    ProjectCommand::Create(fields) => {
      let input = project_input(fields).await?;
      let mutation = app.api.project.add_project(input)?;
      print_message(&app.mutate(mutation).await?);
    }
    ProjectCommand::Update { id, fields } => {
      let input = project_input(fields).await?;
      let mutation = app.api.project.update_project(&id, input)?;
      print_message(&app.mutate(mutation).await?);
    }
    ProjectCommand::Delete { id } => {
      let mutation = app.api.project.delete_project(&id)?;
      print_message(&app.mutate(mutation).await?);
    }
  }
  Ok(())
}

async fn project_input(args: ProjectArgs) -> Result<ProjectInput> {
  Ok(ProjectInput {
    title: args.title,
    description: args.description,
    technology: args.technology,
    duration: args.duration,
    live_url: args.live_url,
    backend_repo_url: args.backend_repo_url,
    frontend_repo_url: args.frontend_repo_url,
    image: read_optional_file(args.image.as_deref()).await?,
  })
}

async fn skill<T: Transport>(app: &mut AppContext<T>, cmd: SkillCommand) -> Result<()> {
  match cmd {
    SkillCommand::List => {
      let def = app.api.skill.all_skills();
      for skill in app.fetch(def).await?.iter() {
        println!("{}  {}", skill.id, skill.name);
      }
    }
    SkillCommand::Get { id } => {
      let def = app.api.skill.skill(&id)?;
      print_json(&*app.fetch(def).await?)?;
    }
    SkillCommand::Create { name, icon } => {
      let input = SkillInput {
        name,
        icon: Some(read_file(&icon).await?),
      };
      let mutation = app.api.skill.add_skill(input)?;
      print_message(&app.mutate(mutation).await?);
    }
    SkillCommand::Update { id, name, icon } => {
      let input = SkillInput {
        name,
        icon: read_optional_file(icon.as_deref()).await?,
      };
      let mutation = app.api.skill.update_skill(&id, input)?;
      print_message(&app.mutate(mutation).await?);
    }
    SkillCommand::Delete { id } => {
      let mutation = app.api.skill.delete_skill(&id)?;
      print_message(&app.mutate(mutation).await?);
    }
  }
  Ok(())
}

fn experience_input(args: ExperienceArgs) -> ExperienceInput {
  ExperienceInput {
    company: args.company,
    position: args.position,
    start_date: args.start_date,
    end_date: args.end_date,
    description: args.description,
  }
}

async fn experience<T: Transport>(app: &mut AppContext<T>, cmd: ExperienceCommand) -> Result<()> {
  match cmd {
    ExperienceCommand::List => {
      let def = app.api.experience.all_experiences();
      for exp in app.fetch(def).await?.iter() {
        println!(
          "{}  {} @ {}  {} .. {}",
          exp.id,
          exp.position,
          exp.company,
          date_part(&exp.start_date),
          date_part(&exp.end_date)
        );
      }
    }
    ExperienceCommand::Get { id } => {
      let def = app.api.experience.experience(&id)?;
      print_json(&*app.fetch(def).await?)?;
    }
    ExperienceCommand::Create(fields) => {
      let mutation = app.api.experience.add_experience(experience_input(fields))?;
      print_message(&app.mutate(mutation).await?);
    }
    ExperienceCommand::Update { id, fields } => {
      let mutation = app
        .api
        .experience
        .update_experience(&id, experience_input(fields))?;
      print_message(&app.mutate(mutation).await?);
    }
    ExperienceCommand::Delete { id } => {
      let mutation = app.api.experience.delete_experience(&id)?;
      print_message(&app.mutate(mutation).await?);
    }
  }
  Ok(())
}

async fn contact<T: Transport>(app: &mut AppContext<T>, cmd: ContactCommand) -> Result<()> {
  match cmd {
    ContactCommand::List => {
      let def = app.api.contact.all_contacts();
      for contact in app.fetch(def).await?.iter() {
        println!("{}  {} <{}>: {}", contact.id, contact.name, contact.email, contact.message);
      }
    }
    ContactCommand::Add {
      name,
      email,
      message,
    } => {
      let mutation = app.api.contact.add_contact(ContactInput {
        name,
        email,
        message,
      })?;
      print_message(&app.mutate(mutation).await?);
    }
    ContactCommand::Delete { id } => {
      let mutation = app.api.contact.delete_contact(&id)?;
      print_message(&app.mutate(mutation).await?);
    }
  }
  Ok(())
}

/// `2023-04-01T00:00:00.000Z` → `2023-04-01`
fn date_part(timestamp: &str) -> &str {
  timestamp.split('T').next().unwrap_or(timestamp)
}

fn print_json<S: Serialize>(value: &S) -> Result<()> {
  let text =
    serde_json::to_string_pretty(value).map_err(|e| eyre!("Failed to format response: {}", e))?;
  println!("{}", text);
  Ok(())
}

fn print_message<R>(response: &ApiResponse<R>) {
  if response.message.is_empty() {
    println!("Done");
  } else {
    println!("{}", response.message);
  }
}

async fn read_text(path: &Path) -> Result<String> {
  tokio::fs::read_to_string(path)
    .await
    .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))
}

async fn read_file(path: &Path) -> Result<FilePart> {
  FilePart::read(path)
    .await
    .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))
}

async fn read_optional_file(path: Option<&Path>) -> Result<Option<FilePart>> {
  match path {
    Some(path) => Ok(Some(read_file(path).await?)),
    None => Ok(None),
  }
}
