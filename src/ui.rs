// UI layer: the interactive `init` flow and the `download_data` bulk
// download. Prompts use `dialoguer`, long running steps show an
// `indicatif` spinner or progress bar, and all server calls go through
// `KonfuzioClient`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::{FileVariant, KonfuzioClient};
use crate::error::Error;
use crate::models::{DocumentMeta, Project};
use crate::settings::{self, EnvFileContent, Settings, DEFAULT_DATA_FOLDER, DEFAULT_HOST};

/// Tracing target for the CLI flows.
pub const TRACING_TARGET: &str = "konfuzio_sdk::ui";

/// Printed when the command line is missing or unknown.
pub const CLI_ERROR: &str = "
Please enter a valid command line option.
----------------------------------------
Valid options:
konfuzio_sdk init: inits the konfuzio Package by setting the necessary files
konfuzio_sdk download_data: downloads the data from an example project

These commands should be run inside of your working directory.
";

/// What the user picked from the project table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectChoice {
    Existing(u64),
    Create,
}

/// Interactive bootstrap: credentials, data folder, project.
///
/// The `.env` file is written before the project is chosen; an invalid
/// project id aborts without removing it.
pub fn init(project_folder: &Path) -> Result<()> {
    let user: String = Input::new()
        .with_prompt("Username you use to login to Konfuzio APP")
        .interact_text()?;
    // `Password` hides input in terminal for passwords.
    let password: String = Password::new()
        .with_prompt("Password you use to login to Konfuzio APP")
        .interact()?;
    let host: String = Input::new()
        .with_prompt("Host from where to get the data")
        .default(DEFAULT_HOST.to_string())
        .interact_text()?;

    let client = KonfuzioClient::new(Settings {
        host: host.clone(),
        ..Settings::default()
    })?;

    let spinner = spinner("Requesting token...")?;
    let token = client.request_auth_token(&user, &password);
    spinner.finish_and_clear();
    let client = client.with_token(&token?)?;
    let token = client.settings().token.clone().unwrap_or_default();

    let data_folder = choose_data_folder(project_folder)?;
    settings::write_env_file(
        project_folder,
        &EnvFileContent {
            host: &host,
            user: &user,
            token: &token,
            data_folder: &data_folder,
        },
    )?;

    let mut projects = client.list_projects()?;
    if projects.is_empty() {
        println!("There are no available projects. Creating a new project now...");
        create_project(&client)?;
        projects = client.list_projects()?;
    }

    println!("List with all the available projects for {user}:");
    println!("{}", render_projects_table(&projects));

    let selection: String = Input::new()
        .with_prompt("ID of the project you want to connect")
        .interact_text()?;
    let project_id = match parse_project_selection(&selection, &projects)? {
        ProjectChoice::Existing(id) => id,
        ProjectChoice::Create => {
            println!("Creating a new project...");
            create_project(&client)?
        }
    };

    settings::append_project_id(project_folder, project_id)?;
    tracing::info!(target: TRACING_TARGET, project_id, "Initialized project folder");
    print_success("SDK initialized!");
    Ok(())
}

/// Ask for the data folder, offering another one if the choice already holds data.
fn choose_data_folder(project_folder: &Path) -> Result<String> {
    let mut data_folder: String = Input::new()
        .with_prompt("Folder where to allocate the data")
        .default(DEFAULT_DATA_FOLDER.to_string())
        .interact_text()?;

    let path = project_folder.join(&data_folder);
    if folder_has_content(&path)? {
        println!(
            "The directory {} is not empty. If you choose to continue, the old data will be deleted permanently.",
            path.display()
        );
        let choose_other = Confirm::new()
            .with_prompt("Choose another folder to allocate the data?")
            .default(true)
            .interact()?;
        if choose_other {
            data_folder = Input::new()
                .with_prompt("Folder where to allocate the data")
                .interact_text()?;
        }
    }
    Ok(data_folder)
}

fn create_project(client: &KonfuzioClient) -> Result<u64> {
    let name: String = Input::new()
        .with_prompt("Name of the project")
        .interact_text()?;
    let project_id = client
        .create_project(&name)
        .with_context(|| format!("The project {name} was not created."))?;
    println!(
        "Project {name} (ID {project_id}) was created successfully! Initializing the environment with the project that was created."
    );
    Ok(project_id)
}

/// Whether `path` is a directory with at least one entry.
pub fn folder_has_content(path: &Path) -> std::io::Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    Ok(fs::read_dir(path)?.next().is_some())
}

/// Project table shown during `init`, with the "create" row last.
pub fn render_projects_table(projects: &[Project]) -> String {
    let mut rows: Vec<(String, String)> = projects
        .iter()
        .map(|project| (project.id.to_string(), project.name.clone()))
        .collect();
    rows.push(("0".to_string(), "[TO CREATE A NEW PROJECT]".to_string()));

    let header = ("Project ID", "Project name");
    let width = rows
        .iter()
        .map(|(id, _)| id.len())
        .chain(std::iter::once(header.0.len()))
        .max()
        .unwrap_or_default();

    let mut table = format!("{:<width$}  {}\n", header.0, header.1);
    table.push_str(&format!("{}  {}\n", "-".repeat(width), "-".repeat(header.1.len())));
    for (id, name) in rows {
        table.push_str(&format!("{id:<width$}  {name}\n"));
    }
    table
}

/// Validate the typed project id against the listed projects; `0` means create.
pub fn parse_project_selection(input: &str, projects: &[Project]) -> crate::Result<ProjectChoice> {
    let invalid = || Error::InvalidProject(input.trim().to_string());
    let id: u64 = input.trim().parse().map_err(|_| invalid())?;
    if id == 0 {
        Ok(ProjectChoice::Create)
    } else if projects.iter().any(|project| project.id == id) {
        Ok(ProjectChoice::Existing(id))
    } else {
        Err(invalid())
    }
}

/// Download files and page images of all training and test documents.
pub fn download_data(project_folder: &Path) -> Result<()> {
    println!("Starting the download. Please wait until the data download is finished..");
    let settings = Settings::load(project_folder)?;
    let data_folder = project_folder.join(&settings.data_folder);
    let client = KonfuzioClient::new(settings)?;

    let documents = client.list_documents_meta()?;
    if documents.is_empty() {
        anyhow::bail!("No documents in the training or test set. Please add them.");
    }

    let bar = ProgressBar::new(documents.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40} {pos}/{len} documents ({eta})",
    )?);
    for document in &documents {
        download_document_data(&client, &data_folder, document)
            .with_context(|| format!("Downloading document {} failed", document.id))?;
        bar.inc(1);
    }
    bar.finish_and_clear();

    print_success("Data downloading finished successfully!");
    Ok(())
}

fn download_document_data(
    client: &KonfuzioClient,
    data_folder: &Path,
    document: &DocumentMeta,
) -> Result<()> {
    let folder = data_folder.join("pdf").join(document.id.to_string());
    fs::create_dir_all(&folder)?;

    let file = client.download_document(document.id, FileVariant::Original)?;
    fs::write(folder.join(document_file_name(document)), file)?;

    let details = client.document_details(document.id)?;
    fs::write(
        folder.join("document.json"),
        serde_json::to_vec_pretty(&details)?,
    )?;

    let image_urls: Vec<String> = details
        .pages
        .iter()
        .filter_map(|page| page.image.as_deref())
        .map(|image| client.urls().page_image(image))
        .collect();
    for (index, image) in client.download_images(&image_urls)?.into_iter().enumerate() {
        match image {
            Some(image) => image.save(folder.join(format!("page_{}.png", index + 1)))?,
            None => tracing::warn!(
                target: TRACING_TARGET,
                document_id = document.id,
                page = index + 1,
                "Skipping page image that could not be decoded"
            ),
        }
    }
    Ok(())
}

/// File name for a downloaded document, without any directory part.
pub fn document_file_name(document: &DocumentMeta) -> PathBuf {
    document
        .data_file_name
        .as_deref()
        .and_then(|name| Path::new(name).file_name())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}.pdf", document.id)))
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

pub fn print_success(message: &str) {
    println!("{} {message}", "[SUCCESS]".green().bold());
}

pub fn print_error(error: &anyhow::Error) {
    eprintln!("{} {error:#}", "[ERROR]".red().bold());
}
