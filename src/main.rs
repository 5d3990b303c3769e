use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use lume::api::http::format_api_error;
use lume::resource::DEFAULT_PAGE_SIZE;
use lume::{
    Config, Excel, Job, JobResult, LumeClient, LumeError, Mapping, Pagination, Pdf, Pipeline,
    Target, WorkShop,
};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for the Lume data-mapping service
#[derive(Parser, Debug)]
#[command(name = "lume", version, about, long_about = None)]
struct Args {
    /// API key (overrides LUME_API_KEY and the config file)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Base URL of the mapping API
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Base URL of the file-processing service
    #[arg(long, global = true)]
    files_url: Option<String>,

    /// Give up waiting on an operation after this many seconds (0 waits forever)
    #[arg(long, global = true)]
    poll_timeout: Option<u64>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
struct PageArgs {
    /// Page to start from (1-based)
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Items per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    size: u32,

    /// Keep fetching until the listing is exhausted
    #[arg(long)]
    all: bool,
}

impl PageArgs {
    fn pagination(&self) -> lume::Result<Pagination> {
        Pagination::new(self.page, self.size)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage pipelines
    #[command(subcommand)]
    Pipelines(PipelineCommand),
    /// Manage jobs
    #[command(subcommand)]
    Jobs(JobCommand),
    /// Inspect results
    #[command(subcommand)]
    Results(ResultCommand),
    /// Manage workshops
    #[command(subcommand)]
    Workshops(WorkshopCommand),
    /// Manage target schemas
    #[command(subcommand)]
    Targets(TargetCommand),
    /// Create and inspect mappings
    #[command(subcommand)]
    Mappings(MappingCommand),
    /// Excel conversion and pivot tasks
    #[command(subcommand)]
    Excel(ExcelCommand),
    /// PDF extraction
    #[command(subcommand)]
    Pdf(PdfCommand),
    /// Store the API key in the config file
    SetKey { key: String },
}

#[derive(Subcommand, Debug)]
enum PipelineCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    Get { id: String },
    Create {
        #[arg(long)]
        name: String,
        /// JSON file holding the target schema
        #[arg(long)]
        schema: PathBuf,
        #[arg(long)]
        description: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
    },
    Delete { id: String },
    /// Run the pipeline over a JSON array of records
    Run {
        id: String,
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        immediate: bool,
    },
    /// Create a job with the given records and run it
    RunJob {
        id: String,
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        immediate: bool,
    },
    Mapper { id: String },
    Learn {
        id: String,
        /// Restrict learning to these target fields
        #[arg(long = "field")]
        fields: Vec<String>,
    },
    Workshops {
        id: String,
        #[command(flatten)]
        page: PageArgs,
    },
    CreateWorkshop { id: String },
    TargetSchema { id: String },
    UploadSheets {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "")]
        map_list: String,
        #[arg(long)]
        second_table_row: Option<u32>,
    },
    PopulateSheets {
        #[arg(long)]
        pipeline_ids: String,
        #[arg(long)]
        payload: String,
        #[arg(long)]
        file_type: String,
    },
    Images { id: String },
}

#[derive(Subcommand, Debug)]
enum JobCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    Get { id: String },
    Create {
        #[arg(long)]
        pipeline: String,
        #[arg(long)]
        data: PathBuf,
        /// Run the job right after creating it
        #[arg(long)]
        run: bool,
        #[arg(long)]
        immediate: bool,
    },
    Run {
        id: String,
        #[arg(long)]
        immediate: bool,
    },
    Delete { id: String },
    Results {
        id: String,
        #[command(flatten)]
        page: PageArgs,
    },
    Workshops {
        id: String,
        #[command(flatten)]
        page: PageArgs,
    },
    CreateWorkshop { id: String },
    TargetSchema { id: String },
}

#[derive(Subcommand, Debug)]
enum ResultCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    Get { id: String },
    Spec { id: String },
    Mappings {
        id: String,
        #[command(flatten)]
        page: PageArgs,
    },
    Confidence {
        id: String,
        /// Seconds to wait for the scores
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum WorkshopCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    Get { id: String },
    Delete { id: String },
    /// Run the workshop with a JSON input (mapper, sample, schema or prompt fields)
    Run {
        id: String,
        #[arg(long, value_enum)]
        kind: RunKind,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        immediate: bool,
    },
    Deploy { id: String },
    Results {
        id: String,
        #[command(flatten)]
        page: PageArgs,
    },
    TargetSchema { id: String },
    Mapping { id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RunKind {
    Mapper,
    Sample,
    TargetSchema,
    Prompt,
}

impl From<RunKind> for lume::WorkshopRun {
    fn from(kind: RunKind) -> Self {
        match kind {
            RunKind::Mapper => Self::Mapper,
            RunKind::Sample => Self::Sample,
            RunKind::TargetSchema => Self::TargetSchema,
            RunKind::Prompt => Self::Prompt,
        }
    }
}

#[derive(Subcommand, Debug)]
enum TargetCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    Get { id: String },
    Find {
        id: String,
        #[command(flatten)]
        page: PageArgs,
    },
    Create {
        #[arg(long)]
        schema: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        filename: String,
    },
    Update {
        id: String,
        #[arg(long)]
        schema: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        filename: String,
    },
    Delete { id: String },
    Object { id: String },
    /// Infer a schema from a sample record
    Generate {
        #[arg(long)]
        sample: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum MappingCommand {
    Get { id: String },
    Create {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        schema: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ExcelCommand {
    Convert {
        file: PathBuf,
        /// Uploaded file name, defaults to the local one
        #[arg(long)]
        name: Option<String>,
        /// Comma-separated sheet names (all sheets when empty)
        #[arg(long, default_value = "")]
        sheets: String,
    },
    PivotTasks {
        #[command(flatten)]
        page: PageArgs,
    },
    PivotStatus { id: String },
    PivotUrl { id: String },
}

#[derive(Subcommand, Debug)]
enum PdfCommand {
    AdvForm {
        file: PathBuf,
        #[arg(long)]
        immediate: bool,
    },
    GetAdvForm { id: String },
    AdvForms {
        #[command(flatten)]
        page: PageArgs,
    },
    AdvUrl { id: String },
    Extract {
        file: PathBuf,
        #[arg(long)]
        immediate: bool,
    },
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    Get { id: String },
    Url { id: String },
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, e);
            return None;
        },
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("lume started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("lume").join("lume.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".lume").join("lume.log");
    }
    PathBuf::from("lume.log")
}

/// Build the client: CLI flags win over the environment, which wins over the config file
fn build_client(args: &Args, mut config: Config) -> Result<LumeClient> {
    if let Some(url) = &args.base_url {
        config.base_url = Some(url.clone());
    }
    if let Some(url) = &args.files_url {
        config.files_url = Some(url.clone());
    }
    if let Some(secs) = args.poll_timeout {
        config.poll_timeout_secs = Some(secs);
    }

    let client = match &args.api_key {
        Some(key) => LumeClient::with_base_urls(
            key,
            &config.effective_api_url(),
            &config.effective_files_url(),
        )?
        .with_poll_policy(config.poll_policy()),
        None => LumeClient::from_config(&config)?,
    };
    Ok(client)
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

/// Records file: a JSON array, or a single object treated as one record
fn read_records(path: &Path) -> Result<Vec<Value>> {
    match read_json(path)? {
        Value::Array(items) => Ok(items),
        single => Ok(vec![single]),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn pipeline(id: String) -> Pipeline {
    Pipeline {
        id: Some(id),
        ..Default::default()
    }
}

fn job(id: String) -> Job {
    Job {
        id: Some(id),
        ..Default::default()
    }
}

fn result(id: String) -> JobResult {
    JobResult {
        id: Some(id),
        ..Default::default()
    }
}

fn workshop(id: String) -> WorkShop {
    WorkShop {
        id: Some(id),
        ..Default::default()
    }
}

fn target(id: String) -> Target {
    Target {
        id: Some(id),
        ..Default::default()
    }
}

async fn run_pipelines(client: &LumeClient, command: PipelineCommand) -> Result<()> {
    match command {
        PipelineCommand::List { page } => {
            let pagination = page.pagination()?;
            if page.all {
                let all = lume::resource::collect(pagination, true, |p, s| {
                    client.fetch_page::<Pipeline>("pipelines", p, s)
                })
                .await?;
                print_json(&all)
            } else {
                print_json(&Pipeline::list_page(client, pagination).await?)
            }
        },
        PipelineCommand::Get { id } => print_json(&Pipeline::get_by_id(client, &id).await?),
        PipelineCommand::Create {
            name,
            schema,
            description,
        } => {
            let schema = read_json(&schema)?;
            let created = Pipeline::create(client, &name, &schema, description.as_deref()).await?;
            print_json(&created)
        },
        PipelineCommand::Update {
            id,
            name,
            description,
        } => print_json(&pipeline(id).update(client, &name, &description).await?),
        PipelineCommand::Delete { id } => print_json(&pipeline(id).delete(client).await?),
        PipelineCommand::Run {
            id,
            data,
            immediate,
        } => {
            let records = read_records(&data)?;
            let mapping = pipeline(id)
                .run_pipeline(client, &records, immediate)
                .await
                .context("Pipeline run failed")?;
            print_json(&mapping)
        },
        PipelineCommand::RunJob {
            id,
            data,
            immediate,
        } => {
            let records = read_records(&data)?;
            let result = pipeline(id)
                .run_job(client, &records, immediate)
                .await
                .context("Job run failed")?;
            print_json(&result)
        },
        PipelineCommand::Mapper { id } => print_json(&pipeline(id).get_mapper(client).await?),
        PipelineCommand::Learn { id, fields } => {
            let fields = (!fields.is_empty()).then_some(fields.as_slice());
            print_json(&pipeline(id).learn(client, fields).await?)
        },
        PipelineCommand::Workshops { id, page } => {
            let workshops = pipeline(id)
                .get_workshops(client, page.pagination()?)
                .await?;
            print_json(&workshops)
        },
        PipelineCommand::CreateWorkshop { id } => {
            print_json(&pipeline(id).create_workshop(client).await?)
        },
        PipelineCommand::TargetSchema { id } => {
            print_json(&pipeline(id).get_target_schema(client).await?)
        },
        PipelineCommand::UploadSheets {
            file,
            map_list,
            second_table_row,
        } => {
            let response =
                Pipeline::upload_sheets(client, &file, &map_list, second_table_row).await?;
            print_json(&response)
        },
        PipelineCommand::PopulateSheets {
            pipeline_ids,
            payload,
            file_type,
        } => {
            let response =
                Pipeline::populate_sheets(client, &pipeline_ids, &payload, &file_type).await?;
            print_json(&response)
        },
        PipelineCommand::Images { id } => print_json(&pipeline(id).get_images(client).await?),
    }
}

async fn run_jobs(client: &LumeClient, command: JobCommand) -> Result<()> {
    match command {
        JobCommand::List { page } => {
            print_json(&Job::list(client, page.pagination()?, page.all).await?)
        },
        JobCommand::Get { id } => print_json(&Job::get_by_id(client, &id).await?),
        JobCommand::Create {
            pipeline,
            data,
            run,
            immediate,
        } => {
            let records = read_records(&data)?;
            if run {
                let result = Job::create_and_run(client, &pipeline, &records, immediate)
                    .await
                    .context("Job run failed")?;
                print_json(&result)
            } else {
                print_json(&Job::create(client, &pipeline, &records).await?)
            }
        },
        JobCommand::Run { id, immediate } => {
            let result = job(id)
                .run(client, immediate)
                .await
                .context("Job run failed")?;
            print_json(&result)
        },
        JobCommand::Delete { id } => print_json(&job(id).delete(client).await?),
        JobCommand::Results { id, page } => {
            print_json(&job(id).get_results(client, page.pagination()?, page.all).await?)
        },
        JobCommand::Workshops { id, page } => {
            print_json(&job(id).get_workshops(client, page.pagination()?, page.all).await?)
        },
        JobCommand::CreateWorkshop { id } => print_json(&job(id).create_workshop(client).await?),
        JobCommand::TargetSchema { id } => print_json(&job(id).get_target_schema(client).await?),
    }
}

async fn run_results(client: &LumeClient, command: ResultCommand) -> Result<()> {
    match command {
        ResultCommand::List { page } => {
            print_json(&JobResult::list(client, page.pagination()?).await?)
        },
        ResultCommand::Get { id } => print_json(&JobResult::get_by_id(client, &id).await?),
        ResultCommand::Spec { id } => print_json(&result(id).get_spec(client).await?),
        ResultCommand::Mappings { id, page } => {
            print_json(&result(id).get_mappings(client, page.pagination()?).await?)
        },
        ResultCommand::Confidence { id, timeout } => {
            let scores = result(id)
                .generate_confidence_scores(client, timeout.map(Duration::from_secs))
                .await
                .context("Confidence scoring failed")?;
            print_json(&scores)
        },
    }
}

async fn run_workshops(client: &LumeClient, command: WorkshopCommand) -> Result<()> {
    match command {
        WorkshopCommand::List { page } => {
            print_json(&WorkShop::list(client, page.pagination()?, page.all).await?)
        },
        WorkshopCommand::Get { id } => print_json(&WorkShop::get_by_id(client, &id).await?),
        WorkshopCommand::Delete { id } => print_json(&workshop(id).delete(client).await?),
        WorkshopCommand::Run {
            id,
            kind,
            input,
            immediate,
        } => {
            let input = read_json(&input)?;
            let result = workshop(id)
                .run(client, kind.into(), input, immediate)
                .await
                .context("Workshop run failed")?;
            print_json(&result)
        },
        WorkshopCommand::Deploy { id } => print_json(&workshop(id).deploy(client).await?),
        WorkshopCommand::Results { id, page } => {
            let results = workshop(id)
                .get_results(client, page.pagination()?, page.all)
                .await?;
            print_json(&results)
        },
        WorkshopCommand::TargetSchema { id } => {
            print_json(&workshop(id).get_target_schema(client).await?)
        },
        WorkshopCommand::Mapping { id } => print_json(&workshop(id).get_mapping(client).await?),
    }
}

async fn run_targets(client: &LumeClient, command: TargetCommand) -> Result<()> {
    match command {
        TargetCommand::List { page } => {
            print_json(&Target::list(client, page.pagination()?, page.all).await?)
        },
        TargetCommand::Get { id } => print_json(&Target::get_schema_by_id(client, &id).await?),
        TargetCommand::Find { id, page } => {
            print_json(&Target::find_by_id(client, &id, page.pagination()?).await?)
        },
        TargetCommand::Create {
            schema,
            name,
            filename,
        } => {
            let schema = read_json(&schema)?;
            print_json(&Target::create(client, &schema, &name, &filename).await?)
        },
        TargetCommand::Update {
            id,
            schema,
            name,
            filename,
        } => {
            let schema = read_json(&schema)?;
            print_json(&target(id).update(client, &name, &filename, &schema).await?)
        },
        TargetCommand::Delete { id } => print_json(&target(id).delete(client).await?),
        TargetCommand::Object { id } => print_json(&target(id).get_object(client).await?),
        TargetCommand::Generate { sample } => {
            let sample = read_json(&sample)?;
            print_json(&Target::generate(client, &sample).await?)
        },
    }
}

async fn run_mappings(client: &LumeClient, command: MappingCommand) -> Result<()> {
    match command {
        MappingCommand::Get { id } => print_json(&Mapping::get_by_id(client, &id).await?),
        MappingCommand::Create {
            data,
            name,
            description,
            schema,
        } => {
            let records = read_records(&data)?;
            let schema = read_json(&schema)?;
            let mapping = Mapping::create(client, &records, &name, &description, &schema).await?;
            print_json(&mapping)
        },
    }
}

async fn run_excel(client: &LumeClient, command: ExcelCommand) -> Result<()> {
    match command {
        ExcelCommand::Convert { file, name, sheets } => {
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("Cannot derive an upload name from the file path")?,
            };
            print_json(&Excel::convert_sheets(client, &file, &name, &sheets).await?)
        },
        ExcelCommand::PivotTasks { page } => {
            print_json(&Excel::pivot_tasks(client, page.pagination()?).await?)
        },
        ExcelCommand::PivotStatus { id } => {
            print_json(&Excel::pivot_task_status(client, &id).await?)
        },
        ExcelCommand::PivotUrl { id } => print_json(&Excel::pivot_task_url(client, &id).await?),
    }
}

async fn run_pdf(client: &LumeClient, command: PdfCommand) -> Result<()> {
    match command {
        PdfCommand::AdvForm { file, immediate } => {
            let processed = Pdf::process_adv_form(client, &file, immediate)
                .await
                .context("ADV form processing failed")?;
            print_json(&processed)
        },
        PdfCommand::GetAdvForm { id } => print_json(&Pdf::get_adv_form(client, &id).await?),
        PdfCommand::AdvForms { page } => {
            print_json(&Pdf::adv_forms_page(client, page.pagination()?).await?)
        },
        PdfCommand::AdvUrl { id } => {
            println!("{}", Pdf::get_adv_url(client, &id).await?);
            Ok(())
        },
        PdfCommand::Extract { file, immediate } => {
            let extracted = Pdf::extract_pdf(client, &file, immediate)
                .await
                .context("PDF extraction failed")?;
            print_json(&extracted)
        },
        PdfCommand::List { page } => {
            print_json(&Pdf::pdfs_page(client, page.pagination()?).await?)
        },
        PdfCommand::Get { id } => print_json(&Pdf::get_pdf(client, &id).await?),
        PdfCommand::Url { id } => {
            println!("{}", Pdf::get_pdf_url(client, &id).await?);
            Ok(())
        },
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();

    if let Command::SetKey { key } = &args.command {
        config
            .set_api_key(key)
            .context("Failed to save the API key")?;
        if let Some(path) = Config::config_path() {
            println!("API key saved to {}", path.display());
        }
        return Ok(());
    }

    let client = build_client(&args, config).context("Failed to create Lume client")?;

    match args.command {
        Command::Pipelines(cmd) => run_pipelines(&client, cmd).await,
        Command::Jobs(cmd) => run_jobs(&client, cmd).await,
        Command::Results(cmd) => run_results(&client, cmd).await,
        Command::Workshops(cmd) => run_workshops(&client, cmd).await,
        Command::Targets(cmd) => run_targets(&client, cmd).await,
        Command::Mappings(cmd) => run_mappings(&client, cmd).await,
        Command::Excel(cmd) => run_excel(&client, cmd).await,
        Command::Pdf(cmd) => run_pdf(&client, cmd).await,
        Command::SetKey { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        tracing::error!("{:#}", err);
        match err.downcast_ref::<LumeError>() {
            Some(api_err) => eprintln!("Error: {} ({:#})", format_api_error(api_err), err),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}
