use drivebak::{loc, path::FsPathBuf, Config};
use inquire::validator::{ErrorMessage, Validation};
use inquire::{Confirm, CustomType, CustomUserError, Text};

#[derive(clap::Args)]
pub struct Args {
    /// Directory to back up (repeatable)
    #[clap(long, short = 'd')]
    dir: Vec<FsPathBuf>,

    /// Identifier of the destination Google Drive folder
    #[clap(long, short = 'f')]
    folder_id: Option<String>,

    /// Backup interval in minutes
    #[clap(long, short = 'i')]
    interval: Option<u32>,
}

pub async fn main(args: Args) -> anyhow::Result<()> {
    let directories = if args.dir.is_empty() {
        prompt_directories()?
    } else {
        for dir in &args.dir {
            map_validation_result(validate_directory(dir.as_str()))?;
        }
        args.dir
    };

    let folder_id = match args.folder_id {
        Some(folder_id) => {
            map_validation_result(validate_folder_id(&folder_id))?;
            folder_id
        }
        None => Text::new("Destination Google Drive folder id?")
            .with_validator(validate_folder_id)
            .prompt()?,
    };

    let interval_minutes = match args.interval {
        Some(interval) => {
            map_validation_result(validate_interval(&interval))?;
            interval
        }
        None => CustomType::<u32>::new("Backup interval in minutes?")
            .with_default(60)
            .with_validator(validate_interval)
            .prompt()?,
    };

    let config = Config {
        directories,
        folder_id,
        interval_minutes,
    };
    config.validate()?;

    let config_file = loc::config_file()?;
    println!("Writing configuration file: {config_file}");
    config.save_to_file(&config_file).await?;

    let start_now = Confirm::new("Start the backup loop now?")
        .with_default(true)
        .prompt()?;
    if start_now {
        drivebakd::start(config).await?;
    }
    Ok(())
}

fn prompt_directories() -> anyhow::Result<Vec<FsPathBuf>> {
    let mut directories: Vec<FsPathBuf> = Vec::new();
    loop {
        let input = if directories.is_empty() {
            Text::new("Directory to back up?")
                .with_validator(validate_directory)
                .prompt()?
        } else {
            Text::new("Another directory to back up? (leave empty to finish)")
                .with_validator(validate_directory_or_empty)
                .prompt()?
        };
        if input.is_empty() {
            return Ok(directories);
        }
        directories.push(input.into());
    }
}

fn validate_directory(input: &str) -> Result<Validation, CustomUserError> {
    if input.trim().is_empty() {
        return Ok(Validation::Invalid(ErrorMessage::Custom(
            "a directory path is required".into(),
        )));
    }
    if std::path::Path::new(input).is_dir() {
        Ok(Validation::Valid)
    } else {
        Ok(Validation::Invalid(ErrorMessage::Custom(format!(
            "no such directory: {input}"
        ))))
    }
}

fn validate_directory_or_empty(input: &str) -> Result<Validation, CustomUserError> {
    if input.is_empty() {
        Ok(Validation::Valid)
    } else {
        validate_directory(input)
    }
}

fn validate_folder_id(input: &str) -> Result<Validation, CustomUserError> {
    if input.trim().is_empty() {
        Ok(Validation::Invalid(ErrorMessage::Custom(
            "a Google Drive folder id is required".into(),
        )))
    } else {
        Ok(Validation::Valid)
    }
}

fn validate_interval(input: &u32) -> Result<Validation, CustomUserError> {
    if *input >= 1 {
        Ok(Validation::Valid)
    } else {
        Ok(Validation::Invalid(ErrorMessage::Custom(
            "the interval must be at least one minute".into(),
        )))
    }
}

fn map_error_message(msg: ErrorMessage) -> anyhow::Error {
    match msg {
        ErrorMessage::Default => anyhow::anyhow!("Invalid input"),
        ErrorMessage::Custom(msg) => anyhow::anyhow!("{msg}"),
    }
}

fn map_validation_result(res: Result<Validation, CustomUserError>) -> anyhow::Result<()> {
    match res {
        Ok(Validation::Valid) => Ok(()),
        Ok(Validation::Invalid(msg)) => Err(map_error_message(msg)),
        Err(err) => Err(anyhow::anyhow!("{err}")),
    }
}
