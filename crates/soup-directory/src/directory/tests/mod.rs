mod common;
mod moderation;
