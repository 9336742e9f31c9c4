/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth (ezpass gate), http (cross-cutting layers)
 */
pub mod auth;
pub mod http;
