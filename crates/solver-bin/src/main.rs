alloc::custom_global_allocator!();

#[tokio::main]
async fn main() {
    solver_bin::run::start(std::env::args()).await;
}
