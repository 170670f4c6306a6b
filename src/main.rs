use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use family_cloud::api::{self, FileRecord, StorageUsage, TRASH_RETENTION_DAYS};
use family_cloud::config::{Config, DEFAULT_CONFIG_FILE};
use family_cloud::direct::{fraction_to_percent, BotApiUploader, DirectStatus, DirectUpload};
use family_cloud::{
    logging, CloudClient, PushChannel, SessionEvent, StatusLine, TransferSample, UploadItem, UploadRequest,
    UploadSession,
};

#[derive(Parser, Debug)]
#[command(version, about = "Family cloud storage client")]
struct Args {
    /// Config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange the admin password for a token
    Login {
        #[arg(long)]
        password: Option<String>,
    },
    /// Folders and recent files, or the files of one folder
    Ls {
        #[arg(long)]
        folder: Option<String>,
    },
    Mkdir { name: String },
    /// Delete a folder, its files go to the bin
    Rmdir {
        folder_id: String,
        #[arg(long)]
        yes: bool,
    },
    /// Move a file to the bin
    Rm {
        file_id: String,
        #[arg(long)]
        yes: bool,
    },
    /// List the bin
    Bin,
    Restore { file_id: String },
    /// Delete a file from the bin for good
    Purge { file_id: String },
    EmptyBin {
        #[arg(long)]
        yes: bool,
    },
    /// Toggle public sharing of a folder
    Share { folder_id: String },
    /// Open a share link
    Shared { share_id: String },
    Download {
        file_id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the preview or download link of a file
    Link {
        file_id: String,
        #[arg(long)]
        inline: bool,
        #[arg(long)]
        preview: bool,
    },
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        folder: Option<String>,
        /// Skip the push channel; only the transfer is tracked
        #[arg(long)]
        no_push: bool,
    },
    /// Upload straight to Telegram
    TgUpload { file: PathBuf },
}

fn progress_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::new(100);
    bar.set_style(ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")?.progress_chars("##-"));
    Ok(bar)
}

fn render(bar: &ProgressBar, line: &StatusLine) {
    bar.set_position(line.percent.clamp(0.0, 100.0) as u64);
    bar.set_message(line.message.clone());
}

fn print_files(files: &[&FileRecord]) {
    for file in files {
        println!(
            "{:<26} {:>10}  {:<8} {}",
            file.id,
            file.size.as_deref().unwrap_or("-"),
            format!("{:?}", file.media_kind()),
            file.name
        );
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn empty_bin_prompt(pending: usize) -> String {
    format!("Permanently delete all {pending} items?")
}

async fn upload(config: &Config, client: &CloudClient, files: Vec<PathBuf>, folder: Option<String>, no_push: bool) -> Result<()> {
    let mut items = Vec::with_capacity(files.len());
    for path in &files {
        items.push(UploadItem::from_path(path).await.with_context(|| format!("can't read {}", path.display()))?);
    }

    let mut session = UploadSession::with_eta_ceiling(items.clone(), config.upload.eta_ceiling());
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let cancel = CancellationToken::new();

    let mut socket_id = None;
    let mut push_handle = None;
    if !no_push {
        match PushChannel::connect(&config.server.base_url).await {
            Ok(channel) => {
                socket_id = Some(channel.socket_id().to_string());
                let (mut samples, handle) = channel.subscribe(cancel.clone());
                let forward = event_tx.clone();
                tokio::spawn(async move {
                    while let Some(sample) = samples.recv().await {
                        if forward.send(SessionEvent::Stage(sample)).is_err() {
                            break;
                        }
                    }
                });
                push_handle = Some(handle);
            }
            Err(err) => warn!(%err, "push channel unavailable, processing stages will not be shown"),
        }
    }

    let bar = progress_bar()?;
    session.apply(SessionEvent::Started, Instant::now())?;
    bar.println(session.headline());
    render(&bar, session.status_line());

    let request = UploadRequest {
        items,
        uploaded_by: config.auth.user_name.clone(),
        folder_id: folder,
        socket_id,
    };
    let transfer_tx = event_tx.clone();
    let uploader = client.clone();
    let mut upload = tokio::spawn(async move {
        let on_progress = Arc::new(move |sample: TransferSample| {
            let _ = transfer_tx.send(SessionEvent::Transfer(sample));
        });
        uploader.upload_multiple(&request, on_progress).await
    });

    let outcome = loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                let line = session.apply(event, Instant::now())?;
                render(&bar, line);
            }
            result = &mut upload => break result,
        }
    };

    while let Ok(event) = event_rx.try_recv() {
        let line = session.apply(event, Instant::now())?;
        render(&bar, line);
    }

    let finished = match outcome {
        Ok(Ok(())) => SessionEvent::Completed,
        Ok(Err(err)) => SessionEvent::Failed(err.to_string()),
        Err(err) => SessionEvent::Failed(err.to_string()),
    };
    session.apply(finished, Instant::now())?;
    bar.finish_with_message(session.headline());

    cancel.cancel();
    if let Some(handle) = push_handle {
        if let Ok(Err(err)) = handle.await {
            warn!(%err, "push channel ended with an error");
        }
    }

    match session.failure() {
        Some(reason) => bail!("upload failed: {reason}"),
        None => Ok(()),
    }
}

async fn tg_upload(config: &Config, file: PathBuf) -> Result<()> {
    let uploader = BotApiUploader::new(&config.telegram.bot_token, &config.telegram.chat_id, config.server.timeout())?;
    let bar = progress_bar()?;

    let status_bar = bar.clone();
    let upload = DirectUpload::new(
        uploader,
        Arc::new(move |status: &DirectStatus| status_bar.set_message(status.to_string())),
    );
    let position = bar.clone();
    let status = upload
        .run(
            &file,
            Arc::new(move |fraction: f64| position.set_position(fraction_to_percent(fraction) as u64)),
        )
        .await;
    bar.finish();

    match status {
        DirectStatus::Complete(document_id) => {
            println!("File ID: {document_id}");
            Ok(())
        }
        other => bail!("{other}"),
    }
}

async fn run(args: Args, config: Config) -> Result<()> {
    let client = CloudClient::new(&config.server.base_url, config.server.timeout())?
        .with_token(config.auth.token.clone());

    match args.command {
        Command::Login { password } => {
            let password = match password {
                Some(password) => password,
                None => {
                    print!("Password: ");
                    io::stdout().flush()?;
                    let mut line = String::new();
                    io::stdin().lock().read_line(&mut line)?;
                    line.trim_end().to_string()
                }
            };
            let token = client.login(&password).await?;
            println!("export FAMILY_CLOUD_TOKEN={token}");
        }
        Command::Ls { folder } => {
            let dashboard = client.dashboard().await?;
            if folder.is_none() {
                for f in &dashboard.folders {
                    let visibility = if f.is_public { "public" } else { "private" };
                    println!("{:<26} {:<8} {}/", f.id, visibility, f.name);
                }
            }
            let view = api::files_in_view(&dashboard.files, &dashboard.recent, folder.as_deref());
            print_files(&view);
            println!("{}", StorageUsage::from_files(&dashboard.files));
        }
        Command::Mkdir { name } => client.create_folder(&name).await?,
        Command::Rmdir { folder_id, yes } => {
            if yes || confirm("Delete this folder? Its files will be moved to the bin.")? {
                client.delete_folder(&folder_id).await?;
            }
        }
        Command::Rm { file_id, yes } => {
            if yes || confirm("Delete this file?")? {
                client.delete_file(&file_id).await?;
            }
        }
        Command::Bin => {
            let files = client.trash().await?;
            if files.is_empty() {
                println!("Bin is empty");
            } else {
                println!("Items in the trash are deleted after {TRASH_RETENTION_DAYS} days.");
                print_files(&files.iter().collect::<Vec<_>>());
            }
        }
        Command::Restore { file_id } => client.restore(&file_id).await?,
        Command::Purge { file_id } => {
            if confirm("Delete forever? You cannot undo this.")? {
                client.delete_permanent(&file_id).await?;
            }
        }
        Command::EmptyBin { yes } => {
            let pending = client.trash().await?.len();
            if pending == 0 {
                println!("Bin is empty");
            } else if yes || confirm(&empty_bin_prompt(pending))? {
                let count = client.empty_trash().await?;
                println!("{count} items deleted");
            }
        }
        Command::Share { folder_id } => {
            client.toggle_public(&folder_id).await?;
            let folders = client.list_folders().await?;
            match folders.iter().find(|f| f.id == folder_id) {
                Some(f) if f.is_public => match &f.share_id {
                    Some(share_id) => println!("{}", api::share_link(&config.server.share_origin, share_id)),
                    None => println!("Public, but no share id was issued"),
                },
                Some(_) => println!("Private"),
                None => bail!("folder {folder_id} not found"),
            }
        }
        Command::Shared { share_id } => {
            let shared = client.public_folder(&share_id).await?;
            println!("{}", shared.name);
            print_files(&shared.files.iter().collect::<Vec<_>>());
        }
        Command::Download { file_id, output } => {
            let dest = output.unwrap_or_else(|| PathBuf::from(&file_id));
            let bar = progress_bar()?;
            let position = bar.clone();
            let bytes = client
                .download(
                    &file_id,
                    &dest,
                    Some(Arc::new(move |sample: TransferSample| position.set_position(sample.percent() as u64))),
                )
                .await?;
            bar.finish_with_message(format!("{} -> {}", api::format_size(bytes), dest.display()));
        }
        Command::Link { file_id, inline, preview } => {
            let url = if preview {
                client.preview_url(&file_id)?
            } else {
                client.download_url(&file_id, inline)?
            };
            println!("{url}");
        }
        Command::Upload { files, folder, no_push } => upload(&config, &client, files, folder, no_push).await?,
        Command::TgUpload { file } => tg_upload(&config, file).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load_or_default(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    config.apply_env_overrides();
    logging::init(&config.logging);

    run(args, config).await
}
