// Strongly-typed model of the Java types referenced by generated code.
//
// Closed variant set: the LUB pass in `lub.rs` matches on every shape, so a
// new shape is a compile error there until it is handled.
use std::fmt;
use serde::{Serialize, Serializer};

use crate::error::{GenError, Result};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Fully qualified class name; nested classes keep one entry per enclosing class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassName {
    pub package: String,
    pub simple_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Wildcard {
    Unbounded,
    Extends(Box<TypeRef>),
    Super(Box<TypeRef>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    Primitive(Primitive),
    Class(ClassName),
    Parameterized { raw: ClassName, args: Vec<TypeRef> },
    Array(Box<TypeRef>),
    /// Only valid as a type argument.
    Wildcard(Wildcard),
    TypeVar(String),
}

/// A type plus its type-use annotations, compared structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub shape: Shape,
    pub annotations: Vec<ClassName>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ClassName {
    pub fn new(package: impl Into<String>, simple_name: impl Into<String>) -> Self {
        Self { package: package.into(), simple_names: vec![simple_name.into()] }
    }
    /// `java.util.List` → package `java.util`, simple name `List`.
    pub fn from_qualified(name: &str) -> Self {
        match name.rsplit_once('.') {
            Some((package, simple)) => Self::new(package, simple),
            None => Self::new("", name),
        }
    }
    pub fn nested(&self, simple_name: impl Into<String>) -> Self {
        let mut simple_names = self.simple_names.clone();
        simple_names.push(simple_name.into());
        Self { package: self.package.clone(), simple_names }
    }
    pub fn simple_name(&self) -> &str {
        self.simple_names.last().map(String::as_str).unwrap_or_default()
    }
    pub fn enclosing(&self) -> Option<ClassName> {
        if self.simple_names.len() < 2 {
            return None
        }
        let mut simple_names = self.simple_names.clone();
        simple_names.pop();
        Some(Self { package: self.package.clone(), simple_names })
    }
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Self::Boolean, Self::Byte, Self::Char, Self::Short,
        Self::Int, Self::Long, Self::Float, Self::Double,
    ];
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.keyword() == keyword)
    }
}

impl TypeRef {
    fn plain(shape: Shape) -> Self {
        Self { shape, annotations: Vec::new() }
    }
    pub fn primitive(primitive: Primitive) -> Self {
        Self::plain(Shape::Primitive(primitive))
    }
    pub fn class(class: ClassName) -> Self {
        Self::plain(Shape::Class(class))
    }
    pub fn parameterized(raw: ClassName, args: Vec<TypeRef>) -> Self {
        Self::plain(Shape::Parameterized { raw, args })
    }
    pub fn array(component: TypeRef) -> Self {
        Self::plain(Shape::Array(Box::new(component)))
    }
    pub fn type_var(name: impl Into<String>) -> Self {
        Self::plain(Shape::TypeVar(name.into()))
    }
    pub fn extends(upper: TypeRef) -> Self {
        Self::plain(Shape::Wildcard(Wildcard::Extends(Box::new(upper))))
    }
    pub fn annotated<I: IntoIterator<Item = ClassName>>(mut self, annotations: I) -> Self {
        self.annotations.extend(annotations);
        self
    }
    pub fn without_annotations(&self) -> Self {
        Self::plain(self.shape.clone())
    }
    pub fn is_annotated(&self) -> bool {
        !self.annotations.is_empty()
    }
    /// Parses Java source syntax, e.g. `java.util.List<? extends @a.A b.B>`.
    ///
    /// Unqualified names starting with an upper case letter are type variables;
    /// nested classes are written with `$` (`a.Outer$Inner`).
    pub fn parse(input: &str) -> Result<Self> {
        TypeStringParser::new(input).parse()
    }
}

// ---- Display (Java source syntax) ----

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.package.is_empty() {
            write!(f, "{}.", self.package)?;
        }
        write!(f, "{}", self.simple_names.join("."))
    }
}

fn write_annotations(f: &mut fmt::Formatter<'_>, annotations: &[ClassName]) -> fmt::Result {
    for annotation in annotations {
        write!(f, "@{annotation} ")?;
    }
    Ok(())
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Shape::Array(_) = &self.shape {
            // `@A int @B [] @C []`: element first, then dimensions outermost first
            let mut dimensions = Vec::new();
            let mut current = self;
            while let Shape::Array(component) = &current.shape {
                dimensions.push(&current.annotations);
                current = component;
            }
            write!(f, "{current}")?;
            for annotations in dimensions {
                for annotation in annotations {
                    write!(f, " @{annotation}")?;
                }
                if !annotations.is_empty() {
                    write!(f, " ")?;
                }
                write!(f, "[]")?;
            }
            return Ok(())
        }
        write_annotations(f, &self.annotations)?;
        match &self.shape {
            Shape::Primitive(p) => write!(f, "{}", p.keyword()),
            Shape::Class(c) => write!(f, "{c}"),
            Shape::Parameterized { raw, args } => {
                write!(f, "{raw}<")?;
                for (ix, arg) in args.iter().enumerate() {
                    if ix > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            Shape::Wildcard(Wildcard::Unbounded) => write!(f, "?"),
            Shape::Wildcard(Wildcard::Extends(upper)) => write!(f, "? extends {upper}"),
            Shape::Wildcard(Wildcard::Super(lower)) => write!(f, "? super {lower}"),
            Shape::TypeVar(name) => write!(f, "{name}"),
            Shape::Array(_) => unreachable!("handled above"),
        }
    }
}

impl Serialize for TypeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for ClassName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

enum ParsedClassName {
    Primitive { primitive: Primitive, start: usize },
    Regular(ClassName),
}

struct TypeStringParser<'a> {
    input: &'a str,
    chars: Vec<char>,
    i: usize,
}

impl<'a> TypeStringParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, chars: input.chars().collect(), i: 0 }
    }

    fn c(&self) -> Option<char> {
        self.chars.get(self.i).copied()
    }

    fn try_consume(&mut self, c: char) -> bool {
        if self.c() == Some(c) {
            self.i += 1;
            return true
        }
        false
    }

    fn try_consume_str(&mut self, s: &str) -> bool {
        let expected = s.chars().collect::<Vec<_>>();
        let end = self.i + expected.len();
        if end <= self.chars.len() && self.chars[self.i..end] == expected[..] {
            self.i = end;
            return true
        }
        false
    }

    fn error(&self, message: &str) -> GenError {
        GenError::InvalidTypeString {
            input: self.input.to_string(),
            message: message.to_string(),
            position: self.i,
        }
    }

    fn parse(mut self) -> Result<TypeRef> {
        let parsed = self.parse_non_wildcard(true)?;
        if self.i != self.chars.len() {
            return Err(self.error("Invalid trailing character"))
        }
        Ok(parsed)
    }

    fn parse_non_wildcard(&mut self, top_level: bool) -> Result<TypeRef> {
        let annotations = self.parse_annotations()?;
        let mut class_name = None;
        let mut parsed = match self.maybe_parse_type_var() {
            Some(name) => {
                if self.c() == Some('<') {
                    return Err(self.error("Cannot specify type arguments for type variable"))
                }
                TypeRef::type_var(name)
            }
            None => {
                let name = self.parse_class_name()?;
                let parsed = if self.try_consume('<') {
                    let raw = self.as_class_name(&name)?;
                    let mut args = Vec::new();
                    loop {
                        let arg = match self.maybe_parse_wildcard()? {
                            Some(wildcard) => wildcard,
                            None => self.parse_non_wildcard(false)?,
                        };
                        args.push(arg);
                        if !self.try_consume_str(", ") {
                            break
                        }
                    }
                    if !self.try_consume('>') {
                        return Err(self.error("Expected ', ' or '>'"))
                    }
                    TypeRef::parameterized(raw, args)
                } else {
                    match &name {
                        ParsedClassName::Primitive { primitive, .. } => TypeRef::primitive(*primitive),
                        ParsedClassName::Regular(c) => TypeRef::class(c.clone()),
                    }
                };
                class_name = Some(name);
                parsed
            }
        };
        parsed = parsed.annotated(annotations);

        let mut dimensions = Vec::new();
        loop {
            let mut dimension_annotations = Vec::new();
            if self.try_consume(' ') {
                dimension_annotations = self.parse_annotations()?;
                if dimension_annotations.is_empty() {
                    self.i -= 1;
                    return Err(self.error("Unexpected space"))
                }
            }
            if !self.try_consume('[') {
                if !dimension_annotations.is_empty() {
                    return Err(self.error("Missing '[]'"))
                }
                break
            }
            if !self.try_consume(']') {
                return Err(self.error("Missing ']'"))
            }
            dimensions.push(dimension_annotations);
        }

        // primitives are only allowed as array components inside type arguments
        if dimensions.is_empty() && !top_level {
            if let Some(name) = &class_name {
                self.as_class_name(name)?;
            }
        }
        for dimension_annotations in dimensions.into_iter().rev() {
            parsed = TypeRef::array(parsed).annotated(dimension_annotations);
        }
        Ok(parsed)
    }

    fn parse_annotations(&mut self) -> Result<Vec<ClassName>> {
        let mut annotations = Vec::new();
        while self.try_consume('@') {
            let name = self.parse_class_name()?;
            annotations.push(self.as_class_name(&name)?);
            if !self.try_consume(' ') {
                return Err(self.error("Expected space after annotation"))
            }
        }
        Ok(annotations)
    }

    fn maybe_parse_type_var(&mut self) -> Option<String> {
        if !self.c().is_some_and(char::is_uppercase) {
            return None
        }
        let mut end = self.i;
        while let Some(&c) = self.chars.get(end) {
            if c == '.' || c == '$' {
                return None
            }
            if !is_identifier_char(c) {
                break
            }
            end += 1;
        }
        let name = self.chars[self.i..end].iter().collect::<String>();
        self.i = end;
        Some(name)
    }

    fn maybe_parse_wildcard(&mut self) -> Result<Option<TypeRef>> {
        if !self.try_consume('?') {
            return Ok(None)
        }
        let wildcard = if self.try_consume_str(" extends ") {
            Wildcard::Extends(Box::new(self.parse_non_wildcard(false)?))
        } else if self.try_consume_str(" super ") {
            Wildcard::Super(Box::new(self.parse_non_wildcard(false)?))
        } else {
            Wildcard::Unbounded
        };
        Ok(Some(TypeRef::plain(Shape::Wildcard(wildcard))))
    }

    fn as_class_name(&mut self, parsed: &ParsedClassName) -> Result<ClassName> {
        match parsed {
            ParsedClassName::Regular(c) => Ok(c.clone()),
            ParsedClassName::Primitive { start, .. } => {
                self.i = *start;
                Err(self.error("Primitive type is not allowed here"))
            }
        }
    }

    fn parse_class_name(&mut self) -> Result<ParsedClassName> {
        let start = self.i;
        // index just past the last '.', i.e. where the current segment starts
        let mut segment_start = self.i;
        let mut last_dot = None;
        let mut dollar_positions = Vec::<usize>::new();

        while let Some(c) = self.c() {
            if c == '.' {
                if self.i == segment_start {
                    return Err(self.error("Invalid dot"))
                }
                if !dollar_positions.is_empty() {
                    return Err(self.error("Invalid dot in nested name"))
                }
                last_dot = Some(self.i);
                segment_start = self.i + 1;
            } else if c == '$' {
                if dollar_positions.last().is_some_and(|&p| self.i == p + 1) {
                    return Err(self.error("Invalid $"))
                }
                if self.i == segment_start {
                    return Err(self.error("Missing enclosing name for nested name"))
                }
                dollar_positions.push(self.i);
            } else if !is_identifier_char(c) {
                break
            }
            self.i += 1;
        }

        if start == self.i {
            let message = match self.c() {
                None => "Empty name",
                Some(' ') => "Unexpected space",
                Some(_) => "Empty name or invalid char",
            };
            return Err(self.error(message))
        }
        if segment_start == self.i {
            self.i -= 1;
            return Err(self.error("Invalid trailing dot"))
        }
        if dollar_positions.last().is_some_and(|&p| p + 1 == self.i) {
            self.i -= 1;
            return Err(self.error("Invalid trailing $"))
        }

        let package = match last_dot {
            Some(dot) => self.chars[start..dot].iter().collect::<String>(),
            None => String::new(),
        };
        let mut simple_names = Vec::new();
        let mut name_start = segment_start;
        for &dollar in &dollar_positions {
            simple_names.push(self.chars[name_start..dollar].iter().collect::<String>());
            name_start = dollar + 1;
        }
        simple_names.push(self.chars[name_start..self.i].iter().collect::<String>());

        if package.is_empty() && simple_names.len() == 1 {
            let name = &simple_names[0];
            if name == "void" {
                self.i = start;
                return Err(self.error("'void' is not valid"))
            }
            if let Some(primitive) = Primitive::from_keyword(name) {
                return Ok(ParsedClassName::Primitive { primitive, start })
            }
        }
        Ok(ParsedClassName::Regular(ClassName { package, simple_names }))
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn class(package: &str, names: &[&str]) -> ClassName {
        ClassName { package: package.into(), simple_names: names.iter().map(|x| x.to_string()).collect() }
    }

    fn ann(qualified: &str) -> ClassName {
        ClassName::from_qualified(qualified)
    }

    #[test]
    fn parses_type_strings() {
        let cases = vec![
            ("boolean", TypeRef::primitive(Primitive::Boolean)),
            ("int", TypeRef::primitive(Primitive::Int)),
            ("a", TypeRef::class(class("", &["a"]))),
            ("a.A", TypeRef::class(class("a", &["A"]))),
            ("A$B", TypeRef::class(class("", &["A", "B"]))),
            ("a.b.c.A$B$C", TypeRef::class(class("a.b.c", &["A", "B", "C"]))),
            ("@a.A b.B", TypeRef::class(class("b", &["B"])).annotated([ann("a.A")])),
            ("@T a.A", TypeRef::class(class("a", &["A"])).annotated([class("", &["T"])])),
            (
                "a.A<b.B, c.C>",
                TypeRef::parameterized(class("a", &["A"]), vec![
                    TypeRef::class(class("b", &["B"])),
                    TypeRef::class(class("c", &["C"])),
                ]),
            ),
            (
                "a.A<int[]>",
                TypeRef::parameterized(class("a", &["A"]), vec![
                    TypeRef::array(TypeRef::primitive(Primitive::Int)),
                ]),
            ),
            (
                "a.A<?>",
                TypeRef::parameterized(class("a", &["A"]), vec![
                    TypeRef::plain(Shape::Wildcard(Wildcard::Unbounded)),
                ]),
            ),
            (
                "a.A<? extends T>",
                TypeRef::parameterized(class("a", &["A"]), vec![TypeRef::extends(TypeRef::type_var("T"))]),
            ),
            ("Test", TypeRef::type_var("Test")),
            ("@a.A T", TypeRef::type_var("T").annotated([ann("a.A")])),
            (
                "@a.A int @b.B @c.C [] @d.D []",
                TypeRef::array(
                    TypeRef::array(TypeRef::primitive(Primitive::Int).annotated([ann("a.A")]))
                        .annotated([ann("d.D")]),
                )
                .annotated([ann("b.B"), ann("c.C")]),
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(TypeRef::parse(input).unwrap(), expected, "parsing {input:?}");
        }
    }

    #[test]
    fn display_matches_source_syntax() {
        for input in [
            "java.util.List<? extends @a.A b.B>",
            "a.A<int[], b.B<T, ? extends c.C[], d.D<@e.E U>[]>>",
            "@a.A int @b.B @c.C [] @d.D []",
            "a.A<? super T>",
            "a.Outer.Inner",
        ] {
            let parsed = TypeRef::parse(&input.replace("Outer.Inner", "Outer$Inner")).unwrap();
            assert_eq!(parsed.to_string(), input);
        }
    }

    #[test]
    fn rejects_malformed_type_strings() {
        let cases = [
            ("", "Empty name"),
            (" ", "Unexpected space"),
            ("void", "'void' is not valid"),
            ("a.", "Invalid trailing dot"),
            ("a..A", "Invalid dot"),
            ("a.$A", "Missing enclosing name for nested name"),
            (".A", "Invalid dot"),
            ("A$", "Invalid trailing $"),
            ("A$$B", "Invalid $"),
            ("a.B$C.D", "Invalid dot in nested name"),
            ("@", "Empty name"),
            ("@ a.A", "Unexpected space"),
            ("@a.A", "Expected space after annotation"),
            ("@@a.A b.B", "Empty name or invalid char"),
            ("@a.A  b.B", "Unexpected space"),
            ("@int", "Primitive type is not allowed here"),
            ("a.A<>", "Empty name or invalid char"),
            ("a.A<b.B", "Expected ', ' or '>'"),
            ("a.A<b.B,>", "Expected ', ' or '>'"),
            ("a.A<b.B, ", "Empty name"),
            ("a.A<b.B,  c.C>", "Unexpected space"),
            ("int<a.A>", "Primitive type is not allowed here"),
            ("a.A<int>", "Primitive type is not allowed here"),
            ("?", "Empty name or invalid char"),
            ("a.A<? >", "Expected ', ' or '>'"),
            ("a.A<? extends int>", "Primitive type is not allowed here"),
            ("T<a.A>", "Cannot specify type arguments for type variable"),
            ("a.A<T extends a.B>", "Unexpected space"),
            ("a.A[", "Missing ']'"),
            ("a.A]", "Invalid trailing character"),
            ("a.A @b.B", "Expected space after annotation"),
            ("a.A @b.B ", "Missing '[]'"),
        ];
        for (input, expected) in cases {
            match TypeRef::parse(input) {
                Err(GenError::InvalidTypeString { message, .. }) => {
                    assert_eq!(message, expected, "parsing {input:?}")
                }
                other => panic!("expected error for {input:?}, got {other:?}"),
            }
        }
    }
}
