//! End-to-end scenarios run against an in-process fake of the Granula API.

mod harness;
mod scenarios;
