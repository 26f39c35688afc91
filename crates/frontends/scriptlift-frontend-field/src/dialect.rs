use scriptlift_core::codegen::param_list;
use scriptlift_core::{Dialect, Function, InstHeader, Value};

/// Game frames per second; `f` arguments are frame counts.
const FRAMES_PER_SECOND: f64 = 30.0;

/// Lua-flavoured output: scripts are methods on the owning entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldDialect;

impl Dialect for FieldDialect {
    fn construct_func_signature(&self, func: &Function) -> String {
        let params = param_list(func.param_count);
        if params.is_empty() {
            format!("{} = function(self)", func.name)
        } else {
            format!("{} = function(self, {params})", func.name)
        }
    }

    /// Markers: `f` frames, `d` direction byte, `s` speed, `b` boolean,
    /// `_` nothing.
    fn process_special_metadata(&self, _inst: &InstHeader, value: &Value, marker: char, _position: usize) -> Option<String> {
        match (marker, value) {
            ('f', Value::Int(frames)) => {
                let seconds = f64::from(*frames) / FRAMES_PER_SECOND;
                Some(format!("{frames} --[[ {seconds:.2}s ]]"))
            }
            // A full turn is 256 steps.
            ('d', Value::Int(steps)) => Some(format!("{steps} --[[ {} deg ]]", steps * 360 / 256)),
            ('s', _) => Some(format!("{value} --[[ speed ]]")),
            ('b', Value::Int(0)) => Some("false".to_owned()),
            ('b', Value::Int(1)) => Some("true".to_owned()),
            _ => None,
        }
    }

    fn function_name(&self, index: usize, _address: u32) -> String {
        match index {
            0 => "init".to_owned(),
            1 => "main".to_owned(),
            n => format!("script_{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotate(value: Value, marker: char) -> Option<String> {
        FieldDialect.process_special_metadata(&InstHeader::default(), &value, marker, 0)
    }

    #[test]
    fn frame_and_direction_annotations() {
        assert_eq!(annotate(Value::Int(60), 'f').as_deref(), Some("60 --[[ 2.00s ]]"));
        assert_eq!(annotate(Value::Int(64), 'd').as_deref(), Some("64 --[[ 90 deg ]]"));
        assert_eq!(annotate(Value::Arg(0), 'f'), None);
    }

    #[test]
    fn speed_and_boolean_annotations() {
        assert_eq!(annotate(Value::Int(8), 's').as_deref(), Some("8 --[[ speed ]]"));
        assert_eq!(annotate(Value::Int(1), 'b').as_deref(), Some("true"));
        assert_eq!(annotate(Value::Int(0), 'b').as_deref(), Some("false"));
        assert_eq!(annotate(Value::Int(2), 'b'), None);
        assert_eq!(annotate(Value::Int(2), '_'), None);
    }

    #[test]
    fn function_names_by_entry_index() {
        assert_eq!(FieldDialect.function_name(0, 0), "init");
        assert_eq!(FieldDialect.function_name(1, 0x20), "main");
        assert_eq!(FieldDialect.function_name(4, 0x80), "script_4");
    }

    #[test]
    fn signature_takes_self() {
        let mut func = Function::new("main", 0, 0);
        assert_eq!(FieldDialect.construct_func_signature(&func), "main = function(self)");
        func.param_count = 2;
        assert_eq!(FieldDialect.construct_func_signature(&func), "main = function(self, arg0, arg1)");
    }
}
