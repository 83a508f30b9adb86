use clap::{ArgAction, Parser};
use mp4lut3d::{known_boxes::KnownBox, Mpeg4Container, Node};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Print the box tree of an MP4/MOV file")]
struct Args {
    /// MP4/MOV file path
    path: String,

    /// Limit recursion depth
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Emit JSON instead of human-readable tree
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Serialize)]
struct TreeBox {
    offset: Option<u64>,
    size: u64,
    header_size: u64,
    typ: String,
    full_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    children: Option<Vec<TreeBox>>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mp4lut3d=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut f = BufReader::new(File::open(&args.path)?);
    let file = Mpeg4Container::load(&mut f)?;

    if args.json {
        let tree: Vec<TreeBox> = file
            .contents()
            .iter()
            .map(|n| build_tree(n, 0, args.max_depth))
            .collect();
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    for node in file.contents() {
        print_box(node, 0, args.max_depth);
    }
    Ok(())
}

fn print_box(node: &Node, depth: usize, max_depth: usize) {
    let indent = "  ".repeat(depth);
    let offset = node.start().map(|s| format!("{:#x}", s)).unwrap_or_else(|| "new".into());
    match node {
        Node::Leaf(_) => {
            println!("{indent}{:>8} {:>10} {}", offset, node.size(), node.name());
        }
        Node::Container(c) => {
            println!("{indent}{:>8} {:>10} {} (container)", offset, node.size(), node.name());
            if depth < max_depth {
                for child in c.children() {
                    print_box(child, depth + 1, max_depth);
                }
            }
        }
    }
}

fn build_tree(node: &Node, depth: usize, max_depth: usize) -> TreeBox {
    let children = match node {
        Node::Container(c) if depth < max_depth => Some(
            c.children()
                .iter()
                .map(|child| build_tree(child, depth + 1, max_depth))
                .collect(),
        ),
        _ => None,
    };
    TreeBox {
        offset: node.start(),
        size: node.size(),
        header_size: node.header_size(),
        typ: node.name().to_string(),
        full_name: KnownBox::from(node.name()).full_name(),
        children,
    }
}
