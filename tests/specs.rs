//! Entry point for the black-box CLI specs. Each module under `specs/`
//! drives the `rr` binary end-to-end via `prelude::cli`/`Project`.

mod prelude;

mod cli {
    mod help;
    mod run;
}
