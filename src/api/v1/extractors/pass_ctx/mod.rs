/*!
 * Pass extractor
 *
 * Responsibility:
 * - ezpass middleware が extensions に入れた Pass を handler に渡す
 *
 * Public API:
 * - Authenticated
 */

mod core;

pub use self::core::Authenticated;
