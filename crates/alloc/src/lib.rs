#[cfg(not(feature = "allocator-mimalloc"))]
#[macro_export]
macro_rules! custom_global_allocator {
    () => {};
}

#[cfg(feature = "allocator-mimalloc")]
pub use mimalloc;

#[cfg(feature = "allocator-mimalloc")]
#[macro_export]
macro_rules! custom_global_allocator {
    () => {
        use alloc::mimalloc;

        #[global_allocator]
        static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
    };
}
