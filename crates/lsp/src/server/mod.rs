//! The server adapter. Maps the external LSP document and query events
//! onto the core operations in [`crate::analyzer::Analyzer`], and
//! republishes diagnostics after every workspace transition — clearing any
//! URI that had errors in the previous state but not the new one
//! (stale-error suppression).

use crate::analyzer::Analyzer;
use crate::error::CoreError;
use crate::uri::Uri;
use crate::workspace::WorkspaceState;
use ralph_compiler::{CompilerMessage, MessageKind, SourceIndex};
use std::collections::HashMap;
use std::sync::Mutex;
use tower_lsp::jsonrpc::Result as RpcResult;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

const BUILD_FILE_NAME: &str = "ralph.json";
const SOURCE_EXTENSION: &str = "ral";

pub struct Backend {
    client: Client,
    analyzer: Mutex<Option<Analyzer>>,
    /// Per-file last-published generation: diagnostics never regress — a
    /// stale-version publish is dropped rather than overwriting a newer
    /// one.
    last_published: Mutex<HashMap<Uri, u64>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self { client, analyzer: Mutex::new(None), last_published: Mutex::new(HashMap::new()) }
    }

    fn with_analyzer<T>(&self, f: impl FnOnce(&Analyzer) -> T) -> RpcResult<T> {
        let guard = self.analyzer.lock().expect("backend mutex poisoned");
        match guard.as_ref() {
            Some(analyzer) => Ok(f(analyzer)),
            None => Err(core_error_to_rpc(CoreError::ClientNotConfigured)),
        }
    }

    /// Classifies `uri` by extension and dispatches the matching core
    /// operation; `code` is `Some` for `didOpen`/`didChange`, `None` for
    /// `didSave`/`didClose`.
    async fn handle_document_event(&self, uri: Uri, code: Option<String>) {
        let result = self.with_analyzer(|analyzer| dispatch_by_extension(analyzer, &uri, code));

        match result {
            Ok(Some((state, version))) => self.publish(&state, version).await,
            Ok(None) => {}
            Err(_) => tracing::warn!(%uri, "document event arrived before the workspace was initialized"),
        }
    }

    /// Publishes diagnostics for every URI `state` has messages for, and
    /// clears (publishes an empty list for) every URI that was diagnosed
    /// in the previous round but isn't anymore.
    async fn publish(&self, state: &WorkspaceState, version: u64) {
        let current = self.with_analyzer(|analyzer| analyzer.diagnostics(state)).unwrap_or_default();
        let mut current_uris: Vec<Uri> = Vec::with_capacity(current.len());

        let mut last_published = self.last_published.lock().expect("backend mutex poisoned");
        for (uri, messages) in &current {
            let stale = last_published.get(uri).is_some_and(|published| *published > version);
            if stale {
                continue;
            }
            last_published.insert(uri.clone(), version);
            current_uris.push(uri.clone());

            let code_for_uri = find_code(state, uri);
            let diagnostics = messages.iter().map(|m| to_lsp_diagnostic(m, code_for_uri.as_deref())).collect();
            if let Some(url) = to_url(uri) {
                self.client.publish_diagnostics(url, diagnostics, None).await;
            }
        }

        let stale_uris: Vec<Uri> = last_published
            .keys()
            .filter(|uri| !current_uris.contains(uri))
            .cloned()
            .collect();
        for uri in stale_uris {
            last_published.remove(&uri);
            if let Some(url) = to_url(&uri) {
                self.client.publish_diagnostics(url, Vec::new(), None).await;
            }
        }
    }
}

fn dispatch_by_extension(analyzer: &Analyzer, uri: &Uri, code: Option<String>) -> Result<(WorkspaceState, u64), CoreError> {
    match uri.extension().as_deref() {
        Some(SOURCE_EXTENSION) => Ok(analyzer.code_changed(uri.clone(), code)),
        _ if uri.filename().as_deref() == Some(BUILD_FILE_NAME) => {
            Ok(analyzer.build_changed(uri.clone(), code).unwrap_or_else(|| (analyzer.snapshot(), analyzer.version())))
        }
        _ => Err(CoreError::UnknownFile(uri.clone())),
    }
}

fn find_code(state: &WorkspaceState, uri: &Uri) -> Option<String> {
    if state.build().map(|b| b.build_uri().as_str()) == Some(uri.as_str()) {
        return state.build().and_then(|b| b.code()).map(str::to_string);
    }
    state.sources().iter().find(|s| s.file_uri().as_str() == uri.as_str()).and_then(source_code)
}

fn source_code(source: &crate::source::SourceCodeState) -> Option<String> {
    use crate::source::SourceCodeState as S;
    match source {
        S::UnCompiled { code, .. } => Some(code.clone()),
        S::Parsed(data) => Some(data.code.clone()),
        S::Compiled { code, .. } => Some(code.clone()),
        S::ErrorSource { code, .. } => Some(code.clone()),
        S::OnDisk { .. } | S::ErrorAccess { .. } => None,
    }
}

fn to_lsp_diagnostic(message: &CompilerMessage, code: Option<&str>) -> Diagnostic {
    Diagnostic {
        range: index_to_range(&message.index, code),
        severity: Some(to_lsp_severity(message.kind)),
        message: message.message.clone(),
        source: Some("ralph-lsp".to_string()),
        ..Default::default()
    }
}

fn to_lsp_severity(kind: MessageKind) -> DiagnosticSeverity {
    match kind {
        MessageKind::Error => DiagnosticSeverity::ERROR,
        MessageKind::Warning => DiagnosticSeverity::WARNING,
        MessageKind::Info => DiagnosticSeverity::INFORMATION,
    }
}

/// Byte-offset `SourceIndex` → LSP `Range`, via a line/column conversion
/// over the file's text. Falls back to a zero-width range at (0, 0) when
/// the text isn't available (e.g. an `ErrorAccess` diagnostic).
fn index_to_range(index: &SourceIndex, code: Option<&str>) -> Range {
    let Some(code) = code else { return Range::new(Position::new(0, 0), Position::new(0, 0)) };
    let start = offset_to_position(code, index.offset);
    let end = offset_to_position(code, index.end());
    Range::new(start, end)
}

fn offset_to_position(code: &str, offset: usize) -> Position {
    let clamped = offset.min(code.len());
    let mut line = 0u32;
    let mut last_newline = 0usize;
    for (i, b) in code.as_bytes().iter().enumerate().take(clamped) {
        if *b == b'\n' {
            line += 1;
            last_newline = i + 1;
        }
    }
    let character = code[last_newline..clamped].chars().count() as u32;
    Position::new(line, character)
}

fn to_url(uri: &Uri) -> Option<Url> {
    Some(uri.url().clone())
}

fn core_error_to_rpc(err: CoreError) -> tower_lsp::jsonrpc::Error {
    let mut rpc = tower_lsp::jsonrpc::Error::internal_error();
    rpc.message = err.to_string().into();
    rpc
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> RpcResult<InitializeResult> {
        let root_url = params
            .root_uri
            .or_else(|| params.workspace_folders.as_ref()?.first().map(|f| f.uri.clone()))
            .ok_or_else(|| core_error_to_rpc(CoreError::WorkspaceFolderNotSupplied))?;

        let workspace_uri = Uri::from_url(root_url);
        let mut guard = self.analyzer.lock().expect("backend mutex poisoned");
        *guard = Some(Analyzer::with_real_io(workspace_uri));

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string()]),
                    ..Default::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                diagnostic_provider: Some(DiagnosticServerCapabilities::Options(DiagnosticOptions {
                    identifier: Some("ralph-lsp".to_string()),
                    inter_file_dependencies: true,
                    workspace_diagnostics: false,
                    ..Default::default()
                })),
                ..Default::default()
            },
            server_info: Some(ServerInfo { name: "ralph-lsp".to_string(), version: None }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let result = self.with_analyzer(|analyzer| analyzer.initialize());
        if let Ok((state, version)) = result {
            self.publish(&state, version).await;
        }
        tracing::info!("ralph-lsp workspace initialized");
    }

    async fn shutdown(&self) -> RpcResult<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = Uri::from_url(params.text_document.uri);
        self.handle_document_event(uri, Some(params.text_document.text)).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = Uri::from_url(params.text_document.uri);
        // Full-sync only: the last content change carries the entire
        // document.
        let Some(change) = params.content_changes.into_iter().last() else { return };
        self.handle_document_event(uri, Some(change.text)).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = Uri::from_url(params.text_document.uri);
        self.handle_document_event(uri, None).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = Uri::from_url(params.text_document.uri);
        self.handle_document_event(uri, None).await;
    }

    async fn completion(&self, params: CompletionParams) -> RpcResult<Option<CompletionResponse>> {
        let uri = Uri::from_url(params.text_document_position.text_document.uri);
        let position = params.text_document_position.position;

        let items = self.with_analyzer(|analyzer| {
            let Some(source) = find_source_code(analyzer, &uri) else { return Vec::new() };
            let offset = position_to_offset(&source, position);
            analyzer.completion(&uri, offset)
        })?;

        let items = items.into_iter().map(to_completion_item).collect();
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> RpcResult<Option<GotoDefinitionResponse>> {
        let uri = Uri::from_url(params.text_document_position_params.text_document.uri);
        let position = params.text_document_position_params.position;

        let lsp_locations = self.with_analyzer(|analyzer| {
            let Some(source) = find_source_code(analyzer, &uri) else { return Vec::new() };
            let offset = position_to_offset(&source, position);
            let state = analyzer.snapshot();

            analyzer
                .definition(&uri, offset)
                .into_iter()
                .filter_map(|loc| {
                    let code = find_code(&state, &loc.file_uri);
                    let url = to_url(&loc.file_uri)?;
                    Some(Location { uri: url, range: index_to_range(&loc.index, code.as_deref()) })
                })
                .collect::<Vec<_>>()
        })?;

        if lsp_locations.is_empty() {
            return Ok(None);
        }
        Ok(Some(GotoDefinitionResponse::Array(lsp_locations)))
    }
}

fn find_source_code(analyzer: &Analyzer, uri: &Uri) -> Option<String> {
    let state = analyzer.snapshot();
    state.sources().iter().find(|s| s.file_uri().as_str() == uri.as_str()).and_then(source_code)
}

fn position_to_offset(code: &str, position: Position) -> usize {
    let mut offset = 0usize;
    for (i, line) in code.split('\n').enumerate() {
        if i as u32 == position.line {
            let char_offset: usize = line.chars().take(position.character as usize).map(char::len_utf8).sum();
            return offset + char_offset;
        }
        offset += line.len() + 1;
    }
    code.len()
}

fn to_completion_item(suggestion: crate::completion::Suggestion) -> CompletionItem {
    use crate::completion::SuggestionKind;
    let kind = match suggestion.kind {
        SuggestionKind::Variable => CompletionItemKind::VARIABLE,
        SuggestionKind::Function => CompletionItemKind::FUNCTION,
        SuggestionKind::Type => CompletionItemKind::CLASS,
        SuggestionKind::Interface => CompletionItemKind::INTERFACE,
        SuggestionKind::Keyword => CompletionItemKind::KEYWORD,
    };
    CompletionItem {
        label: suggestion.label,
        kind: Some(kind),
        detail: Some(suggestion.detail),
        documentation: suggestion.documentation.map(Documentation::String),
        insert_text: Some(suggestion.insert),
        ..Default::default()
    }
}
