use forkyard::core::repo::Repository;
use owo_colors::{OwoColorize, Style};

/// Optional columns of the repository table.
#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    pub show_branch: bool,
    pub show_url: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            show_branch: true,
            show_url: false,
        }
    }
}

struct Cell {
    text: String,
    style: Style,
}

impl Cell {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Render repositories as an aligned table, one per line.
pub fn render_table(repos: &[&Repository], opts: TableOptions, color: bool) -> String {
    if repos.is_empty() {
        return "No repositories match.".to_string();
    }

    let header = Style::new().bold();
    let mut rows = vec![header_row(opts, header)];
    rows.extend(repos.iter().map(|repo| repo_row(repo, opts)));

    let widths: Vec<usize> = (0..rows[0].len())
        .map(|col| rows.iter().map(|row| row[col].text.len()).max().unwrap_or(0))
        .collect();

    rows.iter()
        .map(|row| {
            let last = row.len() - 1;
            row.iter()
                .enumerate()
                .map(|(col, cell)| {
                    let text = if col == last {
                        cell.text.clone()
                    } else {
                        format!("{:<width$}", cell.text, width = widths[col])
                    };
                    if color {
                        text.style(cell.style).to_string()
                    } else {
                        text
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn header_row(opts: TableOptions, style: Style) -> Vec<Cell> {
    let mut row = vec![Cell::new("NAME", style), Cell::new("TYPE", style)];
    if opts.show_branch {
        row.push(Cell::new("BRANCH", style));
    }
    if opts.show_url {
        row.push(Cell::new("URL", style));
    }
    row
}

fn repo_row(repo: &Repository, opts: TableOptions) -> Vec<Cell> {
    let mut row = vec![
        Cell::new(&repo.name, Style::new()),
        Cell::new(repo.repo_type.label(), Style::new().cyan()),
    ];
    if opts.show_branch {
        row.push(if repo.git_head.is_empty() {
            Cell::new("-", Style::new().dimmed())
        } else {
            Cell::new(&repo.git_head, Style::new().green())
        });
    }
    if opts.show_url {
        row.push(Cell::new(&repo.remote_url, Style::new().dimmed()));
    }
    row
}
