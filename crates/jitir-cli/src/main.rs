//! Command-line tooling for the kernel JIT: compile a demo kernel to a
//! backend artifact, inspect its IR at each pipeline stage, or launch it
//! on the in-process Velocity accelerator.
//!
//! No textual frontend is in scope (§1 non-goal); every kernel this binary
//! can act on comes from [`kernel::by_name`] rather than a parsed file.

mod kernel;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use jitir_backend::{BackendOptions, BackendTarget, HostArg};
use jitir_runtime::{AcceleratorFamily, CancellationHandle, CompiledKernel, LaunchConfig, Runtime};
use jitir_transform::{run_pipeline, IntrinsicTable};

#[derive(Parser)]
#[command(name = "jitir", about = "Kernel JIT compiler and launch tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a demo kernel for one backend and write its artifact bytes to disk.
    Compile {
        #[arg(short, long, default_value = "vector_scale")]
        kernel: String,
        #[arg(short, long, value_enum, default_value_t = Backend::Velocity)]
        backend: Backend,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Dump the kernel's IR at a chosen pipeline stage.
    Inspect {
        #[arg(short, long, default_value = "vector_scale")]
        kernel: String,
        #[arg(short, long, value_enum)]
        dump: Dump,
        #[arg(short, long, value_enum, default_value_t = Backend::Velocity)]
        backend: Backend,
    },
    /// Launch a demo kernel on the Velocity accelerator over `n` threads.
    Run {
        #[arg(short, long, default_value = "vector_scale")]
        kernel: String,
        #[arg(short, long, value_enum, default_value_t = Accelerator::Velocity)]
        accelerator: Accelerator,
        #[arg(short = 'n', long, default_value_t = 8)]
        n: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    CpuIl,
    Ptx,
    Velocity,
}

impl From<Backend> for BackendTarget {
    fn from(b: Backend) -> Self {
        match b {
            Backend::CpuIl => BackendTarget::CpuIl,
            Backend::Ptx => BackendTarget::Ptx,
            Backend::Velocity => BackendTarget::Velocity,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Accelerator {
    Velocity,
    Ptx,
    OpenCl,
    Amx,
    Npu,
    Ane,
}

impl From<Accelerator> for AcceleratorFamily {
    fn from(a: Accelerator) -> Self {
        match a {
            Accelerator::Velocity => AcceleratorFamily::Velocity,
            Accelerator::Ptx => AcceleratorFamily::Ptx,
            Accelerator::OpenCl => AcceleratorFamily::OpenCl,
            Accelerator::Amx => AcceleratorFamily::Amx,
            Accelerator::Npu => AcceleratorFamily::Npu,
            Accelerator::Ane => AcceleratorFamily::Ane,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Dump {
    Ir,
    LoweredIr,
    Ptx,
}

/// Exit codes (§6 "CLI surface"): 0 success, 2 invalid input, 3 compilation
/// failed, 4 launch failed.
const EXIT_OK: i32 = 0;
const EXIT_INVALID_INPUT: i32 = 2;
const EXIT_COMPILE_FAILED: i32 = 3;
const EXIT_LAUNCH_FAILED: i32 = 4;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Compile { kernel, backend, out } => run_compile(&kernel, backend, &out),
        Commands::Inspect { kernel, dump, backend } => run_inspect(&kernel, dump, backend),
        Commands::Run { kernel, accelerator, n } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("failed to start the tokio runtime");
            runtime.block_on(run_launch(&kernel, accelerator, n))
        }
    };
    process::exit(code);
}

fn run_compile(kernel_name: &str, backend: Backend, out: &PathBuf) -> i32 {
    let Some((program, kernel_id)) = kernel::by_name(kernel_name) else {
        eprintln!("error: unknown kernel '{kernel_name}'");
        return EXIT_INVALID_INPUT;
    };
    let method = program.method(kernel_id).unwrap().clone();
    let mut types = program.types.clone();
    let options = BackendOptions::for_target(backend.into());

    let compiled = match compile_kernel(method, &mut types, &program, &options) {
        Ok(compiled) => compiled,
        Err(msg) => {
            eprintln!("error: compilation failed: {msg}");
            return EXIT_COMPILE_FAILED;
        }
    };

    if let Err(e) = std::fs::write(out, &compiled.artifact.bytes) {
        eprintln!("error: failed to write '{}': {e}", out.display());
        return EXIT_INVALID_INPUT;
    }
    println!(
        "compiled {} for {:?} -> {} ({} bytes)",
        compiled.artifact.entry_point,
        compiled.artifact.backend,
        out.display(),
        compiled.artifact.bytes.len()
    );
    EXIT_OK
}

fn run_inspect(kernel_name: &str, dump: Dump, backend: Backend) -> i32 {
    let Some((program, kernel_id)) = kernel::by_name(kernel_name) else {
        eprintln!("error: unknown kernel '{kernel_name}'");
        return EXIT_INVALID_INPUT;
    };
    let method = program.method(kernel_id).unwrap().clone();

    match dump {
        Dump::Ir => {
            println!("{method:#?}");
            EXIT_OK
        }
        Dump::LoweredIr => {
            let mut types = program.types.clone();
            let options = BackendOptions::for_target(backend.into());
            let table = match options.target {
                BackendTarget::CpuIl => IntrinsicTable::new(),
                BackendTarget::Ptx => jitir_backend::PtxBackend::intrinsic_table(options.ptx_sm),
                BackendTarget::Velocity => jitir_backend::VelocityBackend::intrinsic_table(),
            };
            match run_pipeline(method, &mut types, &program, &table, &options.pipeline) {
                Ok(lowered) => {
                    println!("{:#?}", lowered.method);
                    EXIT_OK
                }
                Err(e) => {
                    eprintln!("error: compilation failed: {e}");
                    EXIT_COMPILE_FAILED
                }
            }
        }
        Dump::Ptx => {
            let mut types = program.types.clone();
            let options = BackendOptions::for_target(BackendTarget::Ptx);
            match compile_kernel(method, &mut types, &program, &options) {
                Ok(compiled) => {
                    println!("{}", String::from_utf8_lossy(&compiled.artifact.bytes));
                    EXIT_OK
                }
                Err(msg) => {
                    eprintln!("error: compilation failed: {msg}");
                    EXIT_COMPILE_FAILED
                }
            }
        }
    }
}

async fn run_launch(kernel_name: &str, accelerator: Accelerator, n: u32) -> i32 {
    let Some((program, kernel_id)) = kernel::by_name(kernel_name) else {
        eprintln!("error: unknown kernel '{kernel_name}'");
        return EXIT_INVALID_INPUT;
    };
    let method = program.method(kernel_id).unwrap();

    let runtime = Runtime::new();
    let family = accelerator.into();
    let accel = runtime.accelerator(family).expect("every family is registered by default");

    let (grid, group) = accel.choose_group_shape(n as u64);
    let config = LaunchConfig::new(family, grid, group).with_cancellation(CancellationHandle::new());

    let kernel_handle = match accel.load_kernel(method, &program.types, &program, &config).await {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("error: compilation failed: {e}");
            return EXIT_COMPILE_FAILED;
        }
    };

    // One flat buffer backs both views: `in` occupies the first `n` i32s,
    // `out` the next `n`. `HostArg::View::device_ptr` is a byte offset into
    // it, not a real device address (§6: the Velocity driver runs in-process).
    let elem_bytes = 4usize;
    let in_offset = 0u64;
    let out_offset = (n as u64) * elem_bytes as u64;
    let mut memory = vec![0u8; 2 * n as usize * elem_bytes];
    for i in 0..n {
        let bytes = (i as i32).to_le_bytes();
        memory[i as usize * elem_bytes..i as usize * elem_bytes + elem_bytes].copy_from_slice(&bytes);
    }

    let args = vec![
        HostArg::View { device_ptr: Some(in_offset), length: n as i64 },
        HostArg::View { device_ptr: Some(out_offset), length: n as i64 },
    ];

    if let Err(e) = accel.launch(&kernel_handle, &config, &args, &mut memory).await {
        eprintln!("error: launch failed: {e}");
        return EXIT_LAUNCH_FAILED;
    }

    let out: Vec<i32> = (0..n)
        .map(|i| {
            let base = out_offset as usize + i as usize * elem_bytes;
            i32::from_le_bytes(memory[base..base + elem_bytes].try_into().unwrap())
        })
        .collect();
    println!("{}", serde_json::to_string(&out).unwrap());
    EXIT_OK
}

/// Run the full lowering pipeline then emit for `options.target`, flattening
/// every stage's error to a display string for the CLI's outermost boundary
/// (§10: "the CLI binary alone may flatten errors to a display string").
fn compile_kernel(
    method: jitir_core::Method,
    types: &mut jitir_core::TypeRegistry,
    program: &jitir_core::Program,
    options: &BackendOptions,
) -> Result<CompiledKernel, String> {
    let table = match options.target {
        BackendTarget::CpuIl => IntrinsicTable::new(),
        BackendTarget::Ptx => jitir_backend::PtxBackend::intrinsic_table(options.ptx_sm),
        BackendTarget::Velocity => jitir_backend::VelocityBackend::intrinsic_table(),
    };
    let lowered = run_pipeline(method, types, program, &table, &options.pipeline).map_err(|e| e.to_string())?;
    CompiledKernel::compile(&lowered, types, options).map_err(|e| e.to_string())
}
