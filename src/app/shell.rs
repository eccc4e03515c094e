use crate::adapters::{OpenAiClient, SqliteSource};
use crate::app::render;
use crate::config::toml_config::DashboardConfig;
use crate::core::chat::{self, ChatSettings, Domain};
use crate::core::filter::{FilterSpec, FilterValue};
use crate::core::overview::Overview;
use crate::core::report::TicketPage;
use crate::core::resolver::{ColumnMap, ColumnRole};
use crate::core::triage::{self, DEFAULT_TRIAGE_QUESTION};
use crate::domain::ports::{ChatProvider, TableSource};
use crate::domain::session::{SessionContext, UserDirectory};
use crate::utils::error::{DashError, Result};
use crate::utils::validation;
use std::io::{BufRead, Write};
use std::sync::Arc;

const MAX_TRIAGE_ROWS: usize = 50;

const HELP: &str = "\
Account
  register <username> <password> <confirm>
  login <username> <password>
  logout
  whoami

Pages (login required)
  dashboard                             overview of users, incidents, datasets and tickets
  tickets [status=S] [priority=P] [category=C] [rows=N]
  columns                               detected ticket columns
  triage [filters] [rows=N] [model=M] [question]
                                        ask the AI assistant about the filtered tickets

AI assistant (login required)
  chat <message>
  domain <Cybersecurity|Data Science|IT Operations>
  model <name>
  temperature <0.0-2.0>
  history
  clear

  help
  quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// 互動式儀表板：逐行讀取指令，每個指令就是一次頁面渲染
pub struct Shell {
    config: DashboardConfig,
    users: UserDirectory,
    session: SessionContext,
    chat: ChatSettings,
    provider: Option<Arc<dyn ChatProvider>>,
    interactive: bool,
}

impl Shell {
    pub fn new(config: DashboardConfig) -> Self {
        let chat = ChatSettings {
            domain: Domain::default(),
            model: config.ai.model().unwrap_or_default().to_string(),
            temperature: config.ai.chat_temperature,
        };

        Self {
            config,
            users: UserDirectory::new(),
            session: SessionContext::new(),
            chat,
            provider: None,
            interactive: false,
        }
    }

    /// 以指定的 provider 取代依設定建立的 HTTP 客戶端
    pub fn with_provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn chat_settings(&self) -> &ChatSettings {
        &self.chat
    }

    pub async fn run<R: BufRead, W: Write + Send>(&mut self, input: R, out: &mut W) -> Result<()> {
        if self.interactive {
            writeln!(out, "🔐 Welcome to opsdash. Type 'help' for commands.")?;
        }

        let mut lines = input.lines();
        loop {
            if self.interactive {
                write!(out, "opsdash> ")?;
                out.flush()?;
            }

            let line = match lines.next() {
                Some(line) => line?,
                None => break,
            };

            if self.execute(&line, out).await? == Flow::Quit {
                break;
            }
        }

        tracing::info!("👋 Shell finished");
        Ok(())
    }

    /// 執行單一指令；使用者層級的錯誤直接顯示，只有輸出失敗才回傳 Err
    pub async fn execute<W: Write + Send>(&mut self, line: &str, out: &mut W) -> Result<Flow> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(Flow::Continue);
        }

        let tokens = match tokenize(trimmed) {
            Ok(tokens) => tokens,
            Err(e) => {
                writeln!(out, "❌ {}", e.user_friendly_message())?;
                return Ok(Flow::Continue);
            }
        };

        let (command, args) = match tokens.split_first() {
            Some((command, args)) => (command.to_lowercase(), args),
            None => return Ok(Flow::Continue),
        };
        tracing::debug!("Command '{}' with {} args", command, args.len());

        let outcome = match command.as_str() {
            "quit" | "exit" => return Ok(Flow::Quit),
            "help" => writeln!(out, "{}", HELP).map_err(DashError::from),
            "register" => self.register(args, out),
            "login" => self.login(args, out),
            "logout" => self.logout(out),
            "whoami" => self.whoami(out),
            _ if !is_page(&command) => writeln!(
                out,
                "❓ Unknown command '{}'. Type 'help' for a list of commands.",
                command
            )
            .map_err(DashError::from),
            _ => match self.session.require_login().err() {
                Some(e) => writeln!(out, "🔒 {}", e.user_friendly_message()).map_err(DashError::from),
                None => self.page(&command, args, out).await,
            },
        };

        match outcome {
            Ok(()) => Ok(Flow::Continue),
            Err(DashError::IoError(e)) => Err(DashError::IoError(e)),
            Err(e) => {
                tracing::warn!(
                    "⚠️ '{}' failed: {} (Category: {:?}, Severity: {:?})",
                    command,
                    e,
                    e.category(),
                    e.severity()
                );
                writeln!(out, "❌ {}", e.user_friendly_message())?;
                Ok(Flow::Continue)
            }
        }
    }

    async fn page<W: Write + Send>(&mut self, command: &str, args: &[String], out: &mut W) -> Result<()> {
        match command {
            "dashboard" => self.dashboard(out),
            "tickets" => self.tickets(args, out),
            "columns" => self.columns(out),
            "triage" => self.triage(args, out).await,
            "chat" => self.send_chat(args, out).await,
            "domain" => self.set_domain(args, out),
            "model" => self.set_model(args, out),
            "temperature" => self.set_temperature(args, out),
            "history" => {
                chat::ensure_started(&mut self.session.transcript, self.chat.domain);
                render::transcript(out, &self.session.transcript)?;
                Ok(())
            }
            "clear" => {
                chat::reset(&mut self.session.transcript, self.chat.domain);
                writeln!(out, "🧹 Conversation cleared.")?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn register<W: Write>(&mut self, args: &[String], out: &mut W) -> Result<()> {
        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or_default();
        self.users.register(arg(0), arg(1), arg(2))?;
        writeln!(out, "✅ Account created. You can now log in.")?;
        Ok(())
    }

    fn login<W: Write>(&mut self, args: &[String], out: &mut W) -> Result<()> {
        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or_default();
        self.users.login(&mut self.session, arg(0), arg(1))?;
        writeln!(out, "✅ Welcome, {}!", self.session.username())?;
        Ok(())
    }

    fn logout<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.session.logout();
        writeln!(out, "👋 Logged out.")?;
        Ok(())
    }

    fn whoami<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.session.is_logged_in() {
            writeln!(out, "Logged in as {}", self.session.username())?;
        } else {
            writeln!(out, "Not logged in.")?;
        }
        Ok(())
    }

    fn open_source(&self) -> Result<SqliteSource> {
        SqliteSource::open(&self.config.database.path)
    }

    fn provider(&self) -> Result<Arc<dyn ChatProvider>> {
        match &self.provider {
            Some(provider) => Ok(Arc::clone(provider)),
            None => Ok(Arc::new(OpenAiClient::from_config(&self.config.ai)?)),
        }
    }

    fn dashboard<W: Write>(&self, out: &mut W) -> Result<()> {
        let source = self.open_source()?;
        let page = Overview::assemble(&source, &self.config.tables, &self.config.overview_options());
        render::overview(out, &page, self.session.username())?;
        Ok(())
    }

    fn load_tickets(&self, query: &TicketQuery) -> Result<TicketPage> {
        let source = self.open_source()?;
        let mut options = self.config.report_options();
        if let Some(rows) = query.rows {
            options.preview_rows = rows;
        }
        TicketPage::load(&source, &self.config.tables.tickets, &query.filters, &options)
    }

    fn tickets<W: Write>(&self, args: &[String], out: &mut W) -> Result<()> {
        let query = TicketQuery::parse(args)?;
        if !query.question.is_empty() {
            return Err(DashError::ValidationError {
                message: format!("Unexpected argument '{}'.", query.question.join(" ")),
            });
        }

        let page = self.load_tickets(&query)?;
        render::ticket_page(out, &page, &query.filters)?;
        Ok(())
    }

    fn columns<W: Write>(&self, out: &mut W) -> Result<()> {
        let source = self.open_source()?;
        let table = &self.config.tables.tickets;
        let columns = source.columns(table);
        if columns.is_empty() {
            return Err(DashError::MissingTable {
                table: table.to_string(),
            });
        }

        render::column_map(out, table, &ColumnMap::detect_columns(&columns[..]))?;
        Ok(())
    }

    async fn triage<W: Write + Send>(&self, args: &[String], out: &mut W) -> Result<()> {
        let query = TicketQuery::parse(args)?;

        let max_rows = query.rows.unwrap_or(self.config.ai.max_rows);
        validation::validate_range("rows", max_rows, 1, MAX_TRIAGE_ROWS)?;

        let model = match &query.model {
            Some(model) => model.clone(),
            None => self.chat.model.clone(),
        };
        self.require_known_model(&model)?;

        let question = if query.question.is_empty() {
            DEFAULT_TRIAGE_QUESTION.to_string()
        } else {
            query.question.join(" ")
        };

        let page = self.load_tickets(&query)?;
        let request = triage::build_request(&page.filtered, &page.columns, max_rows, &question)?;

        let provider = self.provider()?;
        writeln!(
            out,
            "🤖 Sending {} of {} filtered tickets to {}...",
            request.rows_sent,
            page.filtered.len(),
            model
        )?;
        out.flush()?;

        let reply = provider
            .complete(&request.into_chat_request(&model, self.config.ai.triage_temperature))
            .await?;

        render::heading(out, "AI triage")?;
        writeln!(out, "{}", reply)?;
        Ok(())
    }

    async fn send_chat<W: Write + Send>(&mut self, args: &[String], out: &mut W) -> Result<()> {
        let prompt = args.join(" ");
        if prompt.trim().is_empty() {
            return Err(DashError::ValidationError {
                message: "Type a message after 'chat'.".to_string(),
            });
        }

        let provider = self.provider()?;
        write!(out, "🤖 ")?;
        out.flush()?;

        // 記下第一個寫入錯誤，串流結束後再回報
        let mut write_error: Option<std::io::Error> = None;
        chat::send_turn(
            provider.as_ref(),
            &mut self.session.transcript,
            &self.chat,
            &prompt,
            &mut |fragment: &str| {
                if write_error.is_none() {
                    if let Err(e) = write!(out, "{}", fragment).and_then(|_| out.flush()) {
                        write_error = Some(e);
                    }
                }
            },
        )
        .await?;

        if let Some(e) = write_error {
            return Err(DashError::IoError(e));
        }
        writeln!(out)?;
        Ok(())
    }

    fn set_domain<W: Write>(&mut self, args: &[String], out: &mut W) -> Result<()> {
        let domain = Domain::parse(&args.join(" "))?;
        self.chat.domain = domain;
        chat::reset(&mut self.session.transcript, domain);
        writeln!(out, "✅ Domain set to {}. Conversation reset.", domain)?;
        Ok(())
    }

    fn set_model<W: Write>(&mut self, args: &[String], out: &mut W) -> Result<()> {
        let model = args.join(" ");
        self.require_known_model(&model)?;
        writeln!(out, "✅ Model set to {}.", model)?;
        self.chat.model = model;
        Ok(())
    }

    fn set_temperature<W: Write>(&mut self, args: &[String], out: &mut W) -> Result<()> {
        let raw = args.join(" ");
        let temperature: f32 = raw.trim().parse().map_err(|_| DashError::ValidationError {
            message: format!("'{}' is not a number.", raw),
        })?;
        validation::validate_range("temperature", temperature, 0.0, 2.0)?;

        self.chat.temperature = temperature;
        writeln!(out, "✅ Temperature set to {:.1}.", temperature)?;
        Ok(())
    }

    fn require_known_model(&self, model: &str) -> Result<()> {
        if self.config.ai.is_known_model(model) {
            Ok(())
        } else {
            Err(DashError::ValidationError {
                message: format!(
                    "Unknown model '{}'. Available: {}",
                    model,
                    self.config.ai.models.join(", ")
                ),
            })
        }
    }
}

fn is_page(command: &str) -> bool {
    matches!(
        command,
        "dashboard"
            | "tickets"
            | "columns"
            | "triage"
            | "chat"
            | "domain"
            | "model"
            | "temperature"
            | "history"
            | "clear"
    )
}

/// `key=value` 選項加上其餘的自由文字
#[derive(Debug, Clone, Default, PartialEq)]
struct TicketQuery {
    filters: FilterSpec,
    rows: Option<usize>,
    model: Option<String>,
    question: Vec<String>,
}

impl TicketQuery {
    fn parse(args: &[String]) -> Result<Self> {
        let mut query = TicketQuery::default();

        for arg in args {
            let Some((key, value)) = arg.split_once('=') else {
                query.question.push(arg.clone());
                continue;
            };

            match key.to_lowercase().as_str() {
                "status" => query.filters.set(ColumnRole::Status, FilterValue::from_selection(value)),
                "priority" => query
                    .filters
                    .set(ColumnRole::Priority, FilterValue::from_selection(value)),
                "category" => query
                    .filters
                    .set(ColumnRole::Category, FilterValue::from_selection(value)),
                "rows" => {
                    let rows = value.parse::<usize>().map_err(|_| DashError::ValidationError {
                        message: format!("rows must be a whole number, got '{}'.", value),
                    })?;
                    validation::validate_positive_number("rows", rows, 1)?;
                    query.rows = Some(rows);
                }
                "model" => query.model = Some(value.to_string()),
                _ => query.question.push(arg.clone()),
            }
        }
        Ok(query)
    }
}

/// 以空白分隔，雙引號內的空白保留
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(DashError::ValidationError {
            message: "Unterminated quote.".to_string(),
        });
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}
