use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "fixame-pipelines", version, about = "Runs FixAME on a metagenome assembly and builds the platform report")]
pub struct Arguments {

    #[arg(short, long, default_value = "fixame", help = "Module to run: 'fixame' or 'status'")]
    pub module: String,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,

    #[arg(short = 'p', long = "params", help = "JSON job input with assembly_ref, workspace_name, reads_list and optional min_contig_length")]
    pub params_file: Option<String>,

    #[arg(short = 'a', long)]
    pub assembly_ref: Option<String>,

    #[arg(short = 'w', long)]
    pub workspace_name: Option<String>,

    #[arg(short = 'r', long, value_delimiter = ',', help = "Comma-separated list of reads object references")]
    pub reads_list: Option<Vec<String>>,

    #[arg(short = 'l', long)]
    pub min_contig_length: Option<u64>,

    #[arg(long, help = "Scratch directory for staged inputs and results. Defaults to the system temp dir.")]
    pub scratch: Option<String>,

    #[arg(long, help = "Path to FixAME.py. Defaults to the deployment location.")]
    pub tool_path: Option<String>,

    #[arg(short = 't', long, help = "Worker threads passed to FixAME; defaults to the host CPU count")]
    pub threads: Option<usize>,

    #[arg(short = 'o', long = "out", help = "Write the JSON response to this file instead of stdout")]
    pub out_file: Option<String>,

    #[arg(long, env = "SDK_CALLBACK_URL")]
    pub callback_url: Option<String>,

    #[arg(long, env = "KB_AUTH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reads_list_and_length() {
        let args = Arguments::try_parse_from([
            "fixame-pipelines",
            "-a", "1/2/3",
            "-w", "my_ws",
            "--reads-list", "4/5/6,7/8/9",
            "--min-contig-length", "500",
        ]).unwrap();
        assert_eq!(args.module, "fixame");
        assert_eq!(args.reads_list, Some(vec!["4/5/6".to_string(), "7/8/9".to_string()]));
        assert_eq!(args.min_contig_length, Some(500));
        assert!(!args.verbose);
    }

    #[test]
    fn test_status_module() {
        let args = Arguments::try_parse_from(["fixame-pipelines", "-m", "status"]).unwrap();
        assert_eq!(args.module, "status");
        assert!(args.assembly_ref.is_none());
    }
}
