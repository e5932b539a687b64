use std::fmt;

/// A loosely-typed OSC argument, so callers don't depend on `rosc`.
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
    Str(String),
    Bool(bool),
}

impl fmt::Display for OscArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscArg::Int(v) => write!(f, "{}", v),
            OscArg::Float(v) => write!(f, "{}", v),
            OscArg::Str(v) => write!(f, "\"{}\"", v),
            OscArg::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<f32> for OscArg {
    fn from(v: f32) -> Self {
        OscArg::Float(v)
    }
}

impl From<i32> for OscArg {
    fn from(v: i32) -> Self {
        OscArg::Int(v)
    }
}

impl From<bool> for OscArg {
    fn from(v: bool) -> Self {
        OscArg::Bool(v)
    }
}

impl From<&str> for OscArg {
    fn from(v: &str) -> Self {
        OscArg::Str(v.to_string())
    }
}

impl From<String> for OscArg {
    fn from(v: String) -> Self {
        OscArg::Str(v)
    }
}

/// A single OSC message: address pattern plus ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub addr: String,
    pub args: Vec<OscArg>,
}

impl OscMessage {
    pub fn new(addr: impl Into<String>, args: Vec<OscArg>) -> Self {
        Self {
            addr: addr.into(),
            args,
        }
    }

    /// Message carrying one float argument, the shape every instrument
    /// parameter is sent in.
    pub fn float(addr: impl Into<String>, value: f32) -> Self {
        Self::new(addr, vec![OscArg::Float(value)])
    }

    /// First argument as `f32`, if it is numeric.
    pub fn first_f32(&self) -> Option<f32> {
        match self.args.first()? {
            OscArg::Float(v) => Some(*v),
            OscArg::Int(v) => Some(*v as f32),
            _ => None,
        }
    }
}

impl fmt::Display for OscMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
