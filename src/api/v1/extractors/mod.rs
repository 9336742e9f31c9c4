mod pass_ctx;

pub use pass_ctx::Authenticated;
