pub mod cloak;
