//! Literal Lowering
//!
//! Templates, array and object literals, and function values.

use super::{Lowered, Lowerer};
use crate::error::LowerError;
use crate::ir::{
    ClassType, Constant, Expr, FieldSignature, IndexValue, InvokeExpr, Local, Operand, Place,
    Position, Reference, Stmt, Type, Value,
};
use crate::model::sink::FunctionSource;
use crate::parser::ast::{self, ArrayElement, ObjectProperty, TemplateElement};
use tracing::debug;

/// An element value waiting to be stored into a new array.
pub(crate) struct ArrayItem {
    pub index: usize,
    pub operand: Operand,
    pub position: Position,
}

impl<'a> Lowerer<'a> {
    /// Lower a template literal into a `+` chain over its parts
    pub(crate) fn lower_template(
        &mut self,
        template: &ast::TemplateLiteral,
    ) -> Result<Lowered, LowerError> {
        let position = self.position(&template.span);
        let mut stmts = Vec::new();
        let mut parts: Vec<(Operand, Position)> = Vec::new();

        for part in &template.parts {
            match part {
                TemplateElement::String(text) => {
                    let text = self.name(*text);
                    if !text.is_empty() {
                        parts.push((Operand::Constant(Constant::string(text)), position));
                    }
                }
                TemplateElement::Expression(expr) => {
                    let lowered = self.lower_expr(expr)?;
                    let (base, base_pos, base_stmts) = self.local_of(lowered);
                    stmts.extend(base_stmts);
                    let invoke =
                        InvokeExpr::new_instance(base, self.resolver.object_to_string(), Vec::new());
                    let (string, string_pos, string_stmts) = self.temp_of(Lowered::new(
                        Value::expr(Expr::Invoke(invoke)),
                        vec![base_pos, base_pos],
                    ));
                    stmts.extend(string_stmts);
                    parts.push((Operand::Local(string), string_pos));
                }
            }
        }

        let mut parts = parts.into_iter();
        let Some((first, first_pos)) = parts.next() else {
            return Ok(Lowered::with_stmts(
                Value::Constant(Constant::string("")),
                vec![position],
                stmts,
            ));
        };
        let mut acc = Lowered::with_stmts(Value::from(first), vec![first_pos], stmts);
        for (operand, operand_pos) in parts {
            let (left, left_pos, stmts) = self.operand_of(acc);
            acc = Lowered::with_stmts(
                Value::expr(Expr::Binary {
                    op: crate::ir::BinaryOp::Add,
                    left,
                    right: operand,
                }),
                vec![position, left_pos, operand_pos],
                stmts,
            );
        }
        Ok(acc)
    }

    // ========================================================================
    // Arrays
    // ========================================================================

    /// Lower an array literal
    pub(crate) fn lower_array(
        &mut self,
        array: &ast::ArrayExpression,
    ) -> Result<Lowered, LowerError> {
        let position = self.position(&array.span);
        let has_spread = array
            .elements
            .iter()
            .any(|element| matches!(element, Some(ArrayElement::Spread(_))));
        if !has_spread {
            return self.lower_array_run(&array.elements, position);
        }

        // [...xs] copies xs
        if let [Some(ArrayElement::Spread(only))] = array.elements.as_slice() {
            let lowered = self.lower_expr(only)?;
            let (base, base_pos, stmts) = self.local_of(lowered);
            let slice = InvokeExpr::new_instance(base, self.resolver.array_slice(), Vec::new());
            return Ok(Lowered::with_stmts(
                Value::expr(Expr::Invoke(slice)),
                vec![position, base_pos],
                stmts,
            ));
        }

        let mut stmts = Vec::new();
        let mut segments: Vec<(Local, Position)> = Vec::new();
        let mut start = 0;
        for (i, element) in array.elements.iter().enumerate() {
            let Some(ArrayElement::Spread(spread)) = element else {
                continue;
            };
            if start < i {
                let run = self.lower_array_run(&array.elements[start..i], position)?;
                let (local, local_pos, run_stmts) = self.local_of(run);
                stmts.extend(run_stmts);
                segments.push((local, local_pos));
            }
            let lowered = self.lower_expr(spread)?;
            let (local, local_pos, spread_stmts) = self.local_of(lowered);
            stmts.extend(spread_stmts);
            segments.push((local, local_pos));
            start = i + 1;
        }
        if start < array.elements.len() {
            let run = self.lower_array_run(&array.elements[start..], position)?;
            let (local, local_pos, run_stmts) = self.local_of(run);
            stmts.extend(run_stmts);
            segments.push((local, local_pos));
        }

        let mut segments = segments.into_iter();
        let Some((first, first_pos)) = segments.next() else {
            return self.lower_array_run(&[], position);
        };
        let mut positions = vec![position, first_pos];
        let mut args = Vec::new();
        for (local, local_pos) in segments {
            args.push(Operand::Local(local));
            positions.push(local_pos);
        }
        let concat = InvokeExpr::new_instance(first, self.resolver.array_concat(), args);
        Ok(Lowered::with_stmts(
            Value::expr(Expr::Invoke(concat)),
            positions,
            stmts,
        ))
    }

    /// A run of non-spread elements as a new array; holes count toward the length.
    fn lower_array_run(
        &mut self,
        elements: &[Option<ArrayElement>],
        position: Position,
    ) -> Result<Lowered, LowerError> {
        let mut stmts = Vec::new();
        let mut items = Vec::new();
        for (index, element) in elements.iter().enumerate() {
            if let Some(ArrayElement::Expression(expr)) = element {
                let lowered = self.lower_expr(expr)?;
                let (operand, operand_pos, element_stmts) = self.operand_of(lowered);
                stmts.extend(element_stmts);
                items.push(ArrayItem {
                    index,
                    operand,
                    position: operand_pos,
                });
            }
        }
        let types: Vec<Type> = items
            .iter()
            .map(|item| item.operand.ty(self.symbols.locals()))
            .collect();
        let base_ty = Type::least_common(&types);
        let mut array = self.build_array(base_ty, elements.len(), items, position);
        stmts.append(&mut array.stmts);
        array.stmts = stmts;
        Ok(array)
    }

    /// `%a = newarray (T)[len]` followed by one store per item.
    pub(crate) fn build_array(
        &mut self,
        base_ty: Type,
        len: usize,
        items: Vec<ArrayItem>,
        position: Position,
    ) -> Lowered {
        let size = Operand::Constant(Constant::int(len as i64));
        let (array, array_pos, mut stmts) = self.temp_of(Lowered::new(
            Value::expr(Expr::NewArray { base_ty, size }),
            vec![position, position],
        ));
        for item in items {
            let element = Reference::ArrayElement {
                base: array.clone(),
                index: IndexValue::Constant(Constant::int(item.index as i64)),
            };
            let store = self.assign_stmt(
                Place::Ref(element),
                &[item.position, array_pos],
                Value::from(item.operand),
                &[item.position],
            );
            stmts.push(store);
        }
        Lowered::with_stmts(Value::Local(array), vec![array_pos], stmts)
    }

    // ========================================================================
    // Objects and functions
    // ========================================================================

    /// Lower an object literal as an instance of an anonymous class
    pub(crate) fn lower_object(
        &mut self,
        object: &ast::ObjectExpression,
    ) -> Result<Lowered, LowerError> {
        let position = self.position(&object.span);
        let mut stmts: Vec<Stmt> = Vec::new();
        let mut fields: Vec<(String, Operand, Position)> = Vec::new();

        for property in &object.properties {
            match property {
                ObjectProperty::Property(property) => {
                    let Some(key) = self.property_key(&property.key) else {
                        debug!("computed key in object literal is not lowered");
                        continue;
                    };
                    let lowered = self.lower_expr(&property.value)?;
                    let (operand, operand_pos, value_stmts) = self.operand_of(lowered);
                    stmts.extend(value_stmts);
                    fields.push((key, operand, operand_pos));
                }
                ObjectProperty::Spread(_) => {
                    debug!("spread in object literal is not lowered");
                }
            }
        }

        let declared: Vec<(String, Type)> = fields
            .iter()
            .map(|(key, operand, _)| (key.clone(), operand.ty(self.symbols.locals())))
            .collect();
        let class = self.sink.declare_object_literal(self.ctx, &declared);

        let (instance, instance_pos, new_stmts) = self.temp_of(Lowered::new(
            Value::expr(Expr::New {
                class: ClassType::new(class.clone()),
            }),
            vec![position],
        ));
        stmts.extend(new_stmts);

        for ((key, operand, operand_pos), (_, ty)) in fields.into_iter().zip(declared) {
            let field = FieldSignature::new(class.clone(), key, ty);
            let store = self.assign_stmt(
                Place::Ref(Reference::InstanceField {
                    base: instance.clone(),
                    field,
                }),
                &[operand_pos, instance_pos],
                Value::from(operand),
                &[operand_pos],
            );
            stmts.push(store);
        }
        Ok(Lowered::with_stmts(
            Value::Local(instance),
            vec![instance_pos],
            stmts,
        ))
    }

    /// A function or arrow expression, declared as a separate method.
    pub(crate) fn lower_function_value(
        &mut self,
        source: FunctionSource,
        position: Position,
    ) -> Lowered {
        let captures = self.visible_names();
        let signature = self.sink.declare_function(self.ctx, source, captures);
        let local = self.symbols.declare(
            signature.name(),
            Type::Function(Box::new(signature.clone())),
        );
        Lowered::new(Value::Local(local), vec![position])
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{lines, lower_main, model};
    use crate::ir::signature::{DEFAULT_CLASS, DEFAULT_METHOD};
    use crate::ir::Type;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_template_folds_parts() {
        let body = lower_main("let x = 1;\nlet s = `a${x}b`;");
        assert_eq!(
            lines(&body),
            vec![
                "x = 1",
                "%0 = instanceinvoke x.<%builtin: Object.toString()>()",
                "%1 = 'a' + %0",
                "s = %1 + 'b'",
            ]
        );
        let s = body.local_named("s").unwrap();
        assert_eq!(body.locals.ty(s.id), Type::String);
    }

    #[test]
    fn test_empty_template() {
        let body = lower_main("let e = ``;");
        assert_eq!(lines(&body), vec!["e = ''"]);
    }

    #[test]
    fn test_array_literal() {
        let body = lower_main("let xs = [1, 2];");
        assert_eq!(
            lines(&body),
            vec!["%0 = newarray (number)[2]", "%0[0] = 1", "%0[1] = 2", "xs = %0"]
        );
    }

    #[test]
    fn test_array_spread_concatenates_segments() {
        let body = lower_main("let ys = [0, ...xs, 9];");
        assert_eq!(
            lines(&body),
            vec![
                "%0 = newarray (number)[1]",
                "%0[0] = 0",
                "%1 = newarray (number)[1]",
                "%1[0] = 9",
                "ys = instanceinvoke %0.<%builtin: Array.concat(...any[])>(xs, %1)",
            ]
        );
    }

    #[test]
    fn test_single_spread_copies() {
        let body = lower_main("let c = [...xs];");
        assert_eq!(
            lines(&body),
            vec!["c = instanceinvoke xs.<%builtin: Array.slice(number)>()"]
        );
    }

    #[test]
    fn test_object_literal_becomes_anonymous_class() {
        let model = model("let o = { x: 1, y: 'a' };");
        let body = model.body(DEFAULT_CLASS, DEFAULT_METHOD).unwrap();
        assert_eq!(
            lines(body),
            vec!["%0 = new %AC0$%dflt", "%0.x = 1", "%0.y = 'a'", "o = %0"]
        );
        let class = model.class("%AC0$%dflt").unwrap();
        let fields: Vec<(&str, &Type)> = class
            .fields
            .iter()
            .map(|field| (field.name.as_str(), &field.ty))
            .collect();
        assert_eq!(fields, vec![("x", &Type::Number), ("y", &Type::String)]);
    }
}
