//! Bytecode instruction catalog
//!
//! Every opcode is one byte. Its operands follow in the order listed by
//! [`OpcodeMetadata::args`]; the catalog is data, shared by the encoder,
//! the decoder and the stack verifier.

use std::fmt;

use once_cell::sync::Lazy;

/// Kind of one encoded operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// [`CallArgumentsType`], one byte
    ArgType,
    /// Number of stack slots a call consumes
    StackDelta,
    /// String-table index of a resource path
    Resource,
    TypeId,
    ProcId,
    FilterId,
    ListSize,
    Int,
    /// Absolute byte offset inside the proc
    Label,
    Float,
    /// String-table index
    String,
    Reference,
    FormatCount,
    PickCount,
    ConcatCount,
    EnumeratorId,
}

impl ArgKind {
    /// Kinds stored as a little-endian `i32`
    pub fn is_int(self) -> bool {
        !matches!(
            self,
            ArgKind::ArgType | ArgKind::Float | ArgKind::Reference | ArgKind::Label | ArgKind::String | ArgKind::Resource
        )
    }
}

/// Where a call takes its arguments from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CallArgumentsType {
    None = 0,
    FromStack = 1,
    /// Every stack argument is preceded by its key
    FromStackKeyed = 2,
    /// `arglist(list)`
    FromArgumentList = 3,
    /// The caller's own arguments, for a bare `..()`
    FromProcArguments = 4,
}

impl TryFrom<u8> for CallArgumentsType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => CallArgumentsType::None,
            1 => CallArgumentsType::FromStack,
            2 => CallArgumentsType::FromStackKeyed,
            3 => CallArgumentsType::FromArgumentList,
            4 => CallArgumentsType::FromProcArguments,
            other => return Err(other),
        })
    }
}

/// Static description of one opcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeMetadata {
    /// Net operand-stack change, before any operand-dependent adjustment
    pub stack_delta: i32,
    /// Operands in encoding order
    pub args: &'static [ArgKind],
    /// Followed by `count` operands, where the count is the last fixed `Int`
    pub variable_args: bool,
}

macro_rules! opcodes {
    ($($name:ident = $byte:literal, $delta:literal, [$($arg:ident),*], $var:literal;)*) => {
        /// One bytecode instruction
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum DreamProcOpcode {
            $($name = $byte,)*
        }

        impl DreamProcOpcode {
            /// Every opcode, in byte order
            pub const ALL: &'static [DreamProcOpcode] = &[$(DreamProcOpcode::$name,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(DreamProcOpcode::$name => stringify!($name),)*
                }
            }

            fn describe(self) -> OpcodeMetadata {
                match self {
                    $(DreamProcOpcode::$name => OpcodeMetadata {
                        stack_delta: $delta,
                        args: &[$(ArgKind::$arg),*],
                        variable_args: $var,
                    },)*
                }
            }
        }

        impl TryFrom<u8> for DreamProcOpcode {
            type Error = u8;

            fn try_from(value: u8) -> Result<Self, u8> {
                match value {
                    $($byte => Ok(DreamProcOpcode::$name),)*
                    other => Err(other),
                }
            }
        }
    };
}

opcodes! {
    BitShiftLeft = 0x01, -1, [], false;
    PushType = 0x02, 1, [TypeId], false;
    PushString = 0x03, 1, [String], false;
    FormatString = 0x04, 0, [String, FormatCount], false;
    SwitchCaseRange = 0x05, -2, [Label], false;
    PushReferenceValue = 0x06, 1, [Reference], false;
    Rgb = 0x07, 0, [ArgType, StackDelta], false;
    Add = 0x08, -1, [], false;
    Assign = 0x09, 0, [Reference], false;
    Call = 0x0A, 0, [Reference, ArgType, StackDelta], false;
    MultiplyReference = 0x0B, 0, [Reference], false;
    JumpIfFalse = 0x0C, -1, [Label], false;
    CreateStrictAssociativeList = 0x0D, 0, [ListSize], false;
    Jump = 0x0E, 0, [Label], false;
    CompareEquals = 0x0F, -1, [], false;
    Return = 0x10, -1, [], false;
    PushNull = 0x11, 1, [], false;
    Subtract = 0x12, -1, [], false;
    CompareLessThan = 0x13, -1, [], false;
    CompareGreaterThan = 0x14, -1, [], false;
    BooleanAnd = 0x15, -1, [Label], false;
    BooleanNot = 0x16, 0, [], false;
    DivideReference = 0x17, 0, [Reference], false;
    Negate = 0x18, 0, [], false;
    Modulus = 0x19, -1, [], false;
    Append = 0x1A, 0, [Reference], false;
    CreateRangeEnumerator = 0x1B, -3, [EnumeratorId], false;
    Input = 0x1C, 0, [Reference, Reference], false;
    CompareLessThanOrEqual = 0x1D, -1, [], false;
    CreateAssociativeList = 0x1E, 0, [ListSize], false;
    Remove = 0x1F, 0, [Reference], false;
    DeleteObject = 0x20, -1, [], false;
    PushResource = 0x21, 1, [Resource], false;
    CreateList = 0x22, 0, [ListSize], false;
    CallStatement = 0x23, 0, [ArgType, StackDelta], false;
    BitAnd = 0x24, -1, [], false;
    CompareNotEquals = 0x25, -1, [], false;
    PushProc = 0x26, 1, [ProcId], false;
    Divide = 0x27, -1, [], false;
    Multiply = 0x28, -1, [], false;
    BitXorReference = 0x29, 0, [Reference], false;
    BitXor = 0x2A, -1, [], false;
    BitOr = 0x2B, -1, [], false;
    BitNot = 0x2C, 0, [], false;
    Combine = 0x2D, 0, [Reference], false;
    CreateObject = 0x2E, 0, [ArgType, StackDelta], false;
    BooleanOr = 0x2F, -1, [Label], false;
    CreateMultidimensionalList = 0x30, 0, [ListSize], false;
    CompareGreaterThanOrEqual = 0x31, -1, [], false;
    SwitchCase = 0x32, -1, [Label], false;
    Mask = 0x33, 0, [Reference], false;
    Error = 0x35, 0, [], false;
    IsInList = 0x36, -1, [], false;
    PushFloat = 0x38, 1, [Float], false;
    ModulusReference = 0x39, 0, [Reference], false;
    CreateListEnumerator = 0x3A, -1, [EnumeratorId], false;
    Enumerate = 0x3B, 0, [EnumeratorId, Reference, Label], false;
    DestroyEnumerator = 0x3C, 0, [EnumeratorId], false;
    Browse = 0x3D, -3, [], false;
    BrowseResource = 0x3E, -3, [], false;
    OutputControl = 0x3F, -3, [], false;
    BitShiftRight = 0x40, -1, [], false;
    CreateFilteredListEnumerator = 0x41, -1, [EnumeratorId, FilterId], false;
    Power = 0x42, -1, [], false;
    EnumerateAssoc = 0x43, 0, [EnumeratorId, Reference, Reference, Label], false;
    Link = 0x44, -2, [], false;
    Prompt = 0x45, -3, [TypeId], false;
    Ftp = 0x46, -3, [], false;
    Initial = 0x47, -1, [], false;
    AsType = 0x48, -1, [], false;
    IsType = 0x49, -1, [], false;
    LocateCoord = 0x4A, -2, [], false;
    Locate = 0x4B, -1, [], false;
    IsNull = 0x4C, 0, [], false;
    Spawn = 0x4D, -1, [Label], false;
    OutputReference = 0x4E, -1, [Reference], false;
    Output = 0x4F, -2, [], false;
    Pop = 0x51, -1, [], false;
    Prob = 0x52, 0, [], false;
    IsSaved = 0x53, -1, [], false;
    PickUnweighted = 0x54, 0, [PickCount], false;
    PickWeighted = 0x55, 0, [PickCount], false;
    Increment = 0x56, 1, [Reference], false;
    Decrement = 0x57, 1, [Reference], false;
    CompareEquivalent = 0x58, -1, [], false;
    CompareNotEquivalent = 0x59, -1, [], false;
    Throw = 0x5A, 0, [], false;
    IsInRange = 0x5B, -2, [], false;
    MassConcatenation = 0x5C, 0, [ConcatCount], false;
    CreateTypeEnumerator = 0x5D, -1, [EnumeratorId], false;
    PushGlobalVars = 0x5F, 1, [], false;
    ModulusModulus = 0x60, -1, [], false;
    ModulusModulusReference = 0x61, 0, [Reference], false;
    JumpIfNull = 0x64, 0, [Label], false;
    JumpIfNullNoPop = 0x65, 0, [Label], false;
    JumpIfTrueReference = 0x66, 0, [Reference, Label], false;
    JumpIfFalseReference = 0x67, 0, [Reference, Label], false;
    DereferenceField = 0x68, 0, [String], false;
    DereferenceIndex = 0x69, -1, [], false;
    DereferenceCall = 0x6A, 0, [String, ArgType, StackDelta], false;
    PopReference = 0x6B, 0, [Reference], false;
    BitShiftLeftReference = 0x6D, 0, [Reference], false;
    BitShiftRightReference = 0x6E, 0, [Reference], false;
    Try = 0x6F, 0, [Label, Reference], false;
    TryNoValue = 0x70, 0, [Label], false;
    EndTry = 0x71, 0, [], false;
    EnumerateNoAssign = 0x72, 0, [EnumeratorId, Label], false;
    Gradient = 0x73, 0, [ArgType, StackDelta], false;
    AssignInto = 0x74, 0, [Reference], false;
    GetStep = 0x75, -1, [], false;
    Length = 0x76, 0, [], false;
    GetDir = 0x77, -1, [], false;
    DebuggerBreakpoint = 0x78, 0, [], false;
    Sin = 0x79, 0, [], false;
    Cos = 0x7A, 0, [], false;
    Tan = 0x7B, 0, [], false;
    ArcSin = 0x7C, 0, [], false;
    ArcCos = 0x7D, 0, [], false;
    ArcTan = 0x7E, 0, [], false;
    ArcTan2 = 0x7F, -1, [], false;
    Sqrt = 0x80, 0, [], false;
    Log = 0x81, -1, [], false;
    LogE = 0x82, 0, [], false;
    Abs = 0x83, 0, [], false;
    AppendNoPush = 0x84, -1, [Reference], false;
    AssignNoPush = 0x85, -1, [Reference], false;
    PushRefAndDereferenceField = 0x86, 1, [Reference, String], false;
    PushNRefs = 0x87, 0, [Int], true;
    PushNFloats = 0x88, 0, [Int], true;
    PushNResources = 0x89, 0, [Int], true;
    PushStringFloat = 0x8A, 2, [String, Float], false;
    JumpIfReferenceFalse = 0x8B, 0, [Reference, Label], false;
    PushNStrings = 0x8C, 0, [Int], true;
    SwitchOnFloat = 0x8D, 0, [Float, Label], false;
    PushNOfStringFloats = 0x8E, 0, [Int], true;
    CreateListNFloats = 0x8F, 1, [Int], true;
    CreateListNStrings = 0x90, 1, [Int], true;
    CreateListNRefs = 0x91, 1, [Int], true;
    CreateListNResources = 0x92, 1, [Int], true;
    SwitchOnString = 0x93, 0, [String, Label], false;
    IsTypeDirect = 0x95, 0, [TypeId], false;
    NullRef = 0x96, 0, [Reference], false;
    ReturnReferenceValue = 0x97, 0, [Reference], false;
    ReturnFloat = 0x98, 0, [Float], false;
    IndexRefWithString = 0x99, 1, [Reference, String], false;
    PushFloatAssign = 0x9A, 2, [Float, Reference], false;
    NPushFloatAssign = 0x9B, 0, [Int], true;
    Animate = 0x9C, 0, [ArgType, StackDelta], false;
}

/// Indexed by opcode byte; unassigned bytes keep the empty entry
static METADATA: Lazy<Vec<OpcodeMetadata>> = Lazy::new(|| {
    let empty = OpcodeMetadata {
        stack_delta: 0,
        args: &[],
        variable_args: false,
    };
    let mut table = vec![empty; 256];
    for opcode in DreamProcOpcode::ALL {
        table[*opcode as usize] = opcode.describe();
    }
    table
});

/// How control leaves an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    /// Continues with the next instruction
    Next,
    /// May jump to its label; the jump edge changes the depth the
    /// instruction started with by `edge_delta`
    Branch { edge_delta: i32 },
    /// Always jumps to its label
    Jump,
    /// Leaves the proc
    Exit,
}

impl DreamProcOpcode {
    pub fn metadata(self) -> &'static OpcodeMetadata {
        &METADATA[self as usize]
    }

    /// Kind of each trailing operand of a variable-args opcode, per item
    pub fn variable_arg_kinds(self) -> &'static [ArgKind] {
        use DreamProcOpcode::*;
        match self {
            PushNRefs | CreateListNRefs => &[ArgKind::Reference],
            PushNFloats | CreateListNFloats => &[ArgKind::Float],
            PushNStrings | CreateListNStrings => &[ArgKind::String],
            PushNResources | CreateListNResources => &[ArgKind::Resource],
            PushNOfStringFloats => &[ArgKind::String, ArgKind::Float],
            NPushFloatAssign => &[ArgKind::Float, ArgKind::Reference],
            _ => &[],
        }
    }

    pub fn control_flow(self) -> ControlFlow {
        use DreamProcOpcode::*;
        match self {
            Jump => ControlFlow::Jump,
            Return | ReturnFloat | ReturnReferenceValue | Throw => ControlFlow::Exit,
            // Pops the condition on both edges
            JumpIfFalse | Spawn | JumpIfNull => ControlFlow::Branch { edge_delta: -1 },
            // A falsy/truthy left side stays on the stack as the result
            BooleanAnd | BooleanOr | JumpIfNullNoPop => ControlFlow::Branch { edge_delta: 0 },
            // A match pops the switch value along with the case values
            SwitchCase => ControlFlow::Branch { edge_delta: -2 },
            SwitchCaseRange => ControlFlow::Branch { edge_delta: -3 },
            SwitchOnFloat | SwitchOnString => ControlFlow::Branch { edge_delta: -1 },
            // The reference's value is pushed as the result when jumping
            JumpIfTrueReference | JumpIfFalseReference => ControlFlow::Branch { edge_delta: 1 },
            JumpIfReferenceFalse | Enumerate | EnumerateAssoc | EnumerateNoAssign | Try | TryNoValue => {
                ControlFlow::Branch { edge_delta: 0 }
            }
            _ => ControlFlow::Next,
        }
    }

    /// Reference operands of these opcodes never consume their owner
    pub fn references_leave_stack(self) -> bool {
        use DreamProcOpcode::*;
        matches!(
            self,
            JumpIfTrueReference | JumpIfFalseReference | JumpIfReferenceFalse | Enumerate | EnumerateAssoc | Try
        )
    }

    /// Whether a `StackDelta` operand also counts the call's owner
    pub fn call_consumes_owner(self) -> bool {
        matches!(
            self,
            DreamProcOpcode::DereferenceCall | DreamProcOpcode::CallStatement | DreamProcOpcode::CreateObject
        )
    }
}

impl fmt::Display for DreamProcOpcode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

static FINGERPRINT: Lazy<u32> = Lazy::new(|| {
    const FNV_OFFSET: u32 = 0x811C_9DC5;
    const FNV_PRIME: u32 = 0x0100_0193;

    let mut hash = FNV_OFFSET;
    for opcode in DreamProcOpcode::ALL {
        for byte in opcode.name().bytes().chain(std::iter::once(*opcode as u8)) {
            hash ^= u32::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
});

/// FNV-1a over every `(name, byte)` pair of the catalog
///
/// Written into compiled artifacts so a consumer can reject bytecode built
/// for a different instruction set.
pub fn opcodes_fingerprint() -> u32 {
    *FINGERPRINT
}

/// [`opcodes_fingerprint`] as the hex string stored in artifact metadata
pub fn opcodes_version() -> String {
    format!("{:08X}", opcodes_fingerprint())
}
