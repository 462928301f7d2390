fn main() {
    #[cfg(any(feature = "redis-store", feature = "postgres-store"))]
    {
        #[cfg(not(any(feature = "bincode", feature = "messagepack")))]
        compile_error!(
            "persistent stores require either 'bincode' or 'messagepack' feature to be enabled"
        );

        #[cfg(all(feature = "bincode", feature = "messagepack"))]
        compile_error!("Cannot enable both 'bincode' and 'messagepack' features simultaneously");
    }
}
