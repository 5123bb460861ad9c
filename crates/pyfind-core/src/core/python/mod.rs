pub(crate) mod python_cli;
