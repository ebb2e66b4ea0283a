//! Go and C source emission via the Emit trait.
//!
//! Wrapper bodies are assembled as small syntax trees (functions, structs, statement
//! blocks) and turned into text through [`Emit`], so indentation and brace placement live
//! in one place.

/// Trait for emitting source text from syntax nodes.
pub trait Emit {
    /// Convert the node to its source text.
    fn emit(&self) -> String;
}

/// Indentation unit for Go.
pub const GO_INDENT: &str = "\t";
/// Indentation unit for C.
pub const C_INDENT: &str = "    ";

// =============================================================================
// Statements
// =============================================================================

/// A statement inside a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// One or more lines, emitted as-is at the current indentation.
    Line(String),
    /// `head {` body `}`, with an optional `else` branch.
    Block {
        /// Text before the opening brace, e.g. `if options != nil`.
        head: String,
        /// Statements inside the braces.
        body: Vec<Stmt>,
        /// Statements of the `else` branch.
        else_body: Option<Vec<Stmt>>,
    },
    /// Empty line.
    Blank,
}

impl Stmt {
    /// Single line statement.
    pub fn line(text: impl Into<String>) -> Self {
        Stmt::Line(text.into())
    }

    /// Lines from a list of pre-rendered statements.
    pub fn lines<I, S>(lines: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lines.into_iter().map(|l| Stmt::Line(l.into())).collect()
    }

    /// Emit with the given indentation depth and unit.
    pub fn emit_indented(&self, indent: usize, unit: &str) -> String {
        let prefix = unit.repeat(indent);
        match self {
            Stmt::Line(code) => code
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        "\n".to_string()
                    } else {
                        format!("{prefix}{line}\n")
                    }
                })
                .collect(),
            Stmt::Block {
                head,
                body,
                else_body,
            } => {
                let mut output = format!("{prefix}{head} {{\n");
                for stmt in body {
                    output.push_str(&stmt.emit_indented(indent + 1, unit));
                }
                if let Some(else_stmts) = else_body {
                    output.push_str(&format!("{prefix}}} else {{\n"));
                    for stmt in else_stmts {
                        output.push_str(&stmt.emit_indented(indent + 1, unit));
                    }
                }
                output.push_str(&format!("{prefix}}}\n"));
                output
            }
            Stmt::Blank => "\n".to_string(),
        }
    }
}

fn emit_body(body: &[Stmt], unit: &str) -> String {
    body.iter().map(|stmt| stmt.emit_indented(1, unit)).collect()
}

fn emit_doc(doc: &[String]) -> String {
    doc.iter()
        .map(|line| {
            if line.is_empty() {
                "//\n".to_string()
            } else {
                format!("// {line}\n")
            }
        })
        .collect()
}

// =============================================================================
// Go
// =============================================================================

/// A Go function or method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoFunction {
    /// Doc comment lines, without the `// ` prefix.
    pub doc: Vec<String>,
    /// Receiver declaration, e.g. `r *Image`.
    pub receiver: Option<String>,
    /// Function name.
    pub name: String,
    /// Parameter declarations.
    pub params: Vec<String>,
    /// Result types.
    pub results: Vec<String>,
    /// Body statements.
    pub body: Vec<Stmt>,
}

impl Emit for GoFunction {
    fn emit(&self) -> String {
        let mut output = emit_doc(&self.doc);

        let receiver = self
            .receiver
            .as_ref()
            .map(|r| format!("({r}) "))
            .unwrap_or_default();
        let results = match self.results.as_slice() {
            [] => String::new(),
            [single] => format!(" {single}"),
            many => format!(" ({})", many.join(", ")),
        };

        output.push_str(&format!(
            "func {receiver}{}({}){results} {{\n",
            self.name,
            self.params.join(", ")
        ));
        output.push_str(&emit_body(&self.body, GO_INDENT));
        output.push_str("}\n");
        output
    }
}

/// A field of a Go struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoField {
    /// Field name.
    pub name: String,
    /// Field type.
    pub type_name: String,
    /// Doc comment, without the field name.
    pub doc: Option<String>,
}

/// A Go struct type declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoStruct {
    /// Doc comment lines.
    pub doc: Vec<String>,
    /// Type name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<GoField>,
}

impl Emit for GoStruct {
    fn emit(&self) -> String {
        let mut output = emit_doc(&self.doc);
        output.push_str(&format!("type {} struct {{\n", self.name));
        for field in &self.fields {
            if let Some(doc) = field.doc.as_deref().filter(|d| !d.is_empty()) {
                output.push_str(&format!("\t// {} {doc}\n", field.name));
            }
            output.push_str(&format!("\t{} {}\n", field.name, field.type_name));
        }
        output.push_str("}\n");
        output
    }
}

// =============================================================================
// C
// =============================================================================

/// A C function definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CFunction {
    /// File-local (`static`) function.
    pub is_static: bool,
    /// Return type.
    pub return_type: String,
    /// Function name.
    pub name: String,
    /// Parameter declarations.
    pub params: Vec<String>,
    /// Body statements.
    pub body: Vec<Stmt>,
}

impl CFunction {
    fn signature(&self) -> String {
        let storage = if self.is_static { "static " } else { "" };
        let params = if self.params.is_empty() {
            "void".to_string()
        } else {
            self.params.join(", ")
        };
        format!("{storage}{} {}({params})", self.return_type, self.name)
    }

    /// Declaration for a header.
    pub fn prototype(&self) -> String {
        format!("{};", self.signature())
    }
}

impl Emit for CFunction {
    fn emit(&self) -> String {
        let mut output = format!("{} {{\n", self.signature());
        output.push_str(&emit_body(&self.body, C_INDENT));
        output.push_str("}\n");
        output
    }
}
