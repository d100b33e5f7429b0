//! Probe the local Vulkan implementation.
//!
//! Opens the Vulkan library, lists its instance extensions and, with
//! `--instance`, creates an instance and reports which instance-level entry
//! points were resolved.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p vkdispatch-probe
//! cargo run -p vkdispatch-probe -- --instance
//! cargo run -p vkdispatch-probe -- --fake --instance
//! cargo run -p vkdispatch-probe -- --library /opt/vulkan/lib/libvulkan.so.1
//! ```

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use vkdispatch::{vk, InstanceDispatch, InstanceTable, LibraryBuilder};

/// Parsed command line options.
#[derive(Debug, Default)]
struct ProbeArgs {
    fake: bool,
    instance: bool,
    library: Option<String>,
    search_paths: Vec<String>,
}

fn print_help() {
    println!("vkdispatch-probe - report Vulkan entry point availability");
    println!();
    println!("Options:");
    println!("  --fake                Use the headless fake instead of a real library");
    println!("  --instance            Create an instance and report instance functions");
    println!("  --library <PATH>      Try this library before the platform defaults");
    println!("  --search-path <DIR>   Look for the library in DIR first (repeatable)");
    println!("  -h, --help            Show this help");
    println!();
    println!("Environment: VKDISPATCH_LIBRARY, VKDISPATCH_FAKE, RUST_LOG");
}

fn parse_args() -> anyhow::Result<Option<ProbeArgs>> {
    let mut parsed = ProbeArgs::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--fake" => parsed.fake = true,
            "--instance" => parsed.instance = true,
            "--library" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--library needs a path"))?;
                parsed.library = Some(path);
            }
            "--search-path" => {
                let dir = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--search-path needs a directory"))?;
                parsed.search_paths.push(dir);
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Some(parsed))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Some(args) = parse_args()? else {
        print_help();
        return Ok(());
    };

    let mut builder = LibraryBuilder::from_env();
    if args.fake {
        builder = builder.fake(true);
    }
    if let Some(library) = &args.library {
        builder = builder.library_name(library);
    }
    for dir in &args.search_paths {
        builder = builder.search_path(dir);
    }

    let library = Arc::new(unsafe { builder.open() }?);
    match library.path() {
        Some(path) => info!("Loaded {}", path.display()),
        None => info!("Using fake Vulkan library"),
    }

    let extensions = library.enumerate_instance_extensions()?;
    info!("{} instance extensions", extensions.len());
    for extension in &extensions {
        println!("extension {extension}");
    }

    if args.instance {
        probe_instance(library)?;
    }

    Ok(())
}

fn probe_instance(library: Arc<vkdispatch::Library>) -> anyhow::Result<()> {
    let app_info = vk::ApplicationInfo::default()
        .application_name(c"vkdispatch-probe")
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_1);
    let create_info = vk::InstanceCreateInfo::default().application_info(&app_info);

    let instance = unsafe { InstanceDispatch::create(library, &create_info) }?;
    let table = instance.table();
    info!(
        "Resolved {}/{} instance functions",
        table.resolved_count(),
        InstanceTable::SYMBOLS.len()
    );

    for (name, present) in InstanceTable::SYMBOLS.iter().zip(table.presence()) {
        let status = if present { "present" } else { "missing" };
        println!("{status:8} {}", name.to_string_lossy());
    }

    let devices = instance.enumerate_physical_devices()?;
    info!("{} physical devices", devices.len());

    Ok(())
}
