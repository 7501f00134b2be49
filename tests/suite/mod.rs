mod config_file;
mod end_to_end;
