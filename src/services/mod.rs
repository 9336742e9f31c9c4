/*
 * Responsibility
 * - 外部サービス (ezpass) との通信を閉じ込める
 * - middleware / handler からはこの service を使う
 */
pub mod ezpass;
