use tensor_opcache::{BackendContext, Result, TensorId};
use tracing_subscriber::EnvFilter;

/// Run PReLU through the backend and report the live operator count
fn step(backend: &mut BackendContext, label: &str, x: u32, weights: u32, out: u32) -> Result<()> {
    backend.prelu(TensorId(x), 2, TensorId(weights), TensorId(out))?;
    println!(
        "  prelu({label})  -> operators: {}",
        backend.operator_count()
    );
    Ok(())
}

fn dispose(backend: &mut BackendContext, label: &str, id: u32) {
    backend.dispose_data(TensorId(id));
    println!(
        "  dispose({label}) -> operators: {}",
        backend.operator_count()
    );
}

fn run() -> Result<()> {
    let mut backend = BackendContext::init();

    let shape = vec![1, 2];
    backend.register_tensor(TensorId(0), shape.clone(), vec![1.0f32, 2.0])?;
    backend.register_tensor(TensorId(1), shape.clone(), vec![1.0f32, 2.0])?;
    backend.register_tensor(TensorId(2), shape.clone(), vec![1.0f32, 2.0])?;
    backend.register_tensor(TensorId(3), shape.clone(), vec![1.0f32, 2.0])?;
    backend.register_tensor(TensorId(5), shape, vec![0.0f32, 0.0])?;

    println!(
        "Registered {} tensors, operators: {}\n",
        backend.num_tensors(),
        backend.operator_count()
    );

    step(&mut backend, "x0, w0", 0, 2, 5)?;
    step(&mut backend, "x1, w0", 1, 2, 5)?;
    step(&mut backend, "x0, w1", 0, 3, 5)?;
    step(&mut backend, "x1, w1", 1, 3, 5)?;

    dispose(&mut backend, "x0", 0);
    dispose(&mut backend, "x1", 1);
    dispose(&mut backend, "w0", 2);
    dispose(&mut backend, "w1", 3);

    let stats = backend.cache_stats();
    println!(
        "\nCache: {} hits, {} misses, {} constructed, {} destroyed",
        stats.hits, stats.misses, stats.constructed, stats.destroyed
    );

    backend.dispose();
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== PReLU operator lifetime ===\n");

    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    println!("\n✓ Done");
}
