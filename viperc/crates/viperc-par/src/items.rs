//! Declaration parsing: `let` declarations and functions, C-form
//! declarations, `func`/`extern`/`import`/`global`, structs and
//! classes.
//!
//! Function-shaped declarations register their signature in the global
//! function table before the body is parsed so recursive calls
//! resolve. Parameters are declared into a fresh child scope that the
//! resulting `Function` node owns.

use viperc_lex::TokenKind;
use viperc_sem::{MethodSig, ScopeId, TypeId};
use viperc_util::{Span, E_DUPLICATE_STRUCT, E_REDECLARATION};

use crate::ast::{AstNode, ClassField, ClassMethod, Param};
use crate::Parser;

impl<'a> Parser<'a> {
    /// Parse `( T name, T name, ... )`. When `scope` is given, each
    /// parameter is declared into it as a local.
    fn parse_parameter_list(&mut self, scope: Option<ScopeId>) -> Option<Vec<Param>> {
        if !self.expect(TokenKind::LeftParen) {
            return None;
        }
        self.consume();

        let mut params = Vec::new();
        while !self.check(TokenKind::RightParen) && !self.at_end() {
            let ty = self.parse_type()?;
            if !self.expect(TokenKind::Identifier) {
                return None;
            }
            let name_token = self.consume();
            if let Some(scope) = scope {
                if let Err(err) =
                    self.ctx
                        .scopes
                        .declare_local(scope, &name_token.text, ty, name_token.span)
                {
                    self.report(E_REDECLARATION, name_token.span, err.to_string());
                }
            }
            params.push(Param {
                ty,
                name: name_token.text,
            });

            if self.check(TokenKind::RightParen) {
                break;
            }
            if !self.expect(TokenKind::Comma) {
                return None;
            }
            self.consume();
        }

        if !self.expect(TokenKind::RightParen) {
            return None;
        }
        self.consume();
        Some(params)
    }

    fn param_types(params: &[Param]) -> Vec<TypeId> {
        params.iter().map(|p| p.ty).collect()
    }

    /// `let T name [(params)] [= expr]`.
    ///
    /// With a parameter list this declares a function: parameters land
    /// in a child scope, the return type is set for the body, and the
    /// result is a `Function` node (a forward declaration when no `=`
    /// follows). Without one it is a variable declaration, optionally
    /// initialized.
    pub(crate) fn parse_variable_declaration(&mut self) -> Option<AstNode> {
        let keyword = self.consume(); // let
        let ty = self.parse_type()?;
        if !self.expect(TokenKind::Identifier) {
            return None;
        }
        let name_token = self.consume();
        let name = name_token.text.clone();

        if self.check(TokenKind::LeftParen) {
            let scope = self.ctx.scopes.new_scope(self.scope());
            let params = self.parse_parameter_list(Some(scope))?;
            self.ctx
                .functions
                .declare(&name, ty, Self::param_types(&params));

            let body = if self.check(TokenKind::Equals) {
                self.consume();
                self.with_scope(scope, |p| {
                    p.with_return_type(Some(ty), |p| p.parse_expression(0))
                })
                .map(Box::new)
            } else {
                None
            };

            let span = keyword.span.merge(name_token.span);
            return Some(AstNode::Function {
                return_type: ty,
                name,
                params,
                body,
                scope,
                span,
            });
        }

        let local = match self
            .ctx
            .scopes
            .declare_local(self.scope(), &name, ty, name_token.span)
        {
            Ok(local) => Some(local),
            Err(err) => {
                self.report(E_REDECLARATION, name_token.span, err.to_string());
                None
            }
        };

        let init = if self.check(TokenKind::Equals) {
            self.consume();
            self.parse_expression(0).map(Box::new)
        } else {
            None
        };

        let end = init
            .as_deref()
            .map(|i| i.span())
            .unwrap_or(name_token.span);
        Some(AstNode::VariableDecl {
            ty,
            name,
            local,
            init,
            span: keyword.span.merge(end),
        })
    }

    /// A declaration opened by a bare type name: `T name(params) body`
    /// defines a function, `T name [= init]` a variable.
    pub(crate) fn parse_typed_declaration(&mut self) -> Option<AstNode> {
        let start = self.current().span;
        let ty = self.parse_type()?;
        if !self.expect(TokenKind::Identifier) {
            return None;
        }
        let name_token = self.consume();
        let name = name_token.text.clone();

        if self.check(TokenKind::LeftParen) {
            let scope = self.ctx.scopes.new_scope(self.scope());
            let params = self.parse_parameter_list(Some(scope))?;
            self.ctx
                .functions
                .declare(&name, ty, Self::param_types(&params));

            // `;` right after the parameter list is a forward
            // declaration; the terminator is left for the caller.
            let body = if self.check(TokenKind::Semicolon) {
                None
            } else {
                if self.check(TokenKind::Equals) {
                    self.consume();
                }
                self.with_scope(scope, |p| {
                    p.with_return_type(Some(ty), |p| p.parse_expression(0))
                })
                .map(Box::new)
            };

            return Some(AstNode::Function {
                return_type: ty,
                name,
                params,
                body,
                scope,
                span: start.merge(name_token.span),
            });
        }

        let local = match self
            .ctx
            .scopes
            .declare_local(self.scope(), &name, ty, name_token.span)
        {
            Ok(local) => Some(local),
            Err(err) => {
                self.report(E_REDECLARATION, name_token.span, err.to_string());
                None
            }
        };

        let init = if self.check(TokenKind::Equals) {
            self.consume();
            self.parse_expression(0).map(Box::new)
        } else {
            None
        };

        let end = init
            .as_deref()
            .map(|i| i.span())
            .unwrap_or(name_token.span);
        Some(AstNode::VariableDecl {
            ty,
            name,
            local,
            init,
            span: start.merge(end),
        })
    }

    /// `func name(params) [-> T] body` — arrow omitted means `void`.
    pub(crate) fn parse_func_definition(&mut self) -> Option<AstNode> {
        let keyword = self.consume(); // func
        if !self.expect(TokenKind::Identifier) {
            return None;
        }
        let name_token = self.consume();
        let name = name_token.text.clone();

        let scope = self.ctx.scopes.new_scope(self.scope());
        let params = self.parse_parameter_list(Some(scope))?;

        let return_type = if self.check(TokenKind::RightArrow) {
            self.consume();
            self.parse_type()?
        } else {
            self.ctx.types.void()
        };

        self.ctx
            .functions
            .declare(&name, return_type, Self::param_types(&params));

        let body = if self.check(TokenKind::Semicolon) {
            None
        } else {
            self.with_scope(scope, |p| {
                p.with_return_type(Some(return_type), |p| p.parse_expression(0))
            })
            .map(Box::new)
        };

        Some(AstNode::Function {
            return_type,
            name,
            params,
            body,
            scope,
            span: keyword.span.merge(name_token.span),
        })
    }

    /// `import T name(params);` — an external function declaration.
    pub(crate) fn parse_import_statement(&mut self) -> Option<AstNode> {
        let keyword = self.consume(); // import
        let ty = self.parse_type()?;
        if !self.expect(TokenKind::Identifier) {
            return None;
        }
        let name_token = self.consume();
        let params = self.parse_parameter_list(None)?;

        self.ctx
            .functions
            .declare(&name_token.text, ty, Self::param_types(&params));

        Some(AstNode::Import {
            return_type: ty,
            name: name_token.text,
            params,
            span: keyword.span.merge(name_token.span),
        })
    }

    /// `extern T name(params);`.
    pub(crate) fn parse_extern_function(&mut self) -> Option<AstNode> {
        let keyword = self.consume(); // extern
        let ty = self.parse_type()?;
        if !self.expect(TokenKind::Identifier) {
            return None;
        }
        let name_token = self.consume();
        let params = self.parse_parameter_list(None)?;

        self.ctx
            .functions
            .declare(&name_token.text, ty, Self::param_types(&params));

        Some(AstNode::ExternFunction {
            return_type: ty,
            name: name_token.text,
            params,
            span: keyword.span.merge(name_token.span),
        })
    }

    /// `global T name [= expr];` — registered in the global table.
    pub(crate) fn parse_global_declaration(&mut self) -> Option<AstNode> {
        let keyword = self.consume(); // global
        let ty = self.parse_type()?;
        if !self.expect(TokenKind::Identifier) {
            return None;
        }
        let name_token = self.consume();

        if self.ctx.globals.contains(&name_token.text) {
            self.report(
                E_REDECLARATION,
                name_token.span,
                format!("redeclaration of '{}'", name_token.text),
            );
        } else {
            self.ctx.globals.declare(&name_token.text, ty);
        }

        let init = if self.check(TokenKind::Equals) {
            self.consume();
            self.parse_expression(0).map(Box::new)
        } else {
            None
        };

        let end = init
            .as_deref()
            .map(|i| i.span())
            .unwrap_or(name_token.span);
        Some(AstNode::GlobalDecl {
            ty,
            name: name_token.text,
            init,
            span: keyword.span.merge(end),
        })
    }

    /// `struct Name { T name; ... }` — registers the type; the node
    /// itself only carries the handle.
    pub(crate) fn parse_struct_declaration(&mut self) -> Option<AstNode> {
        let keyword = self.consume(); // struct
        if !self.expect(TokenKind::Identifier) {
            return None;
        }
        let name_token = self.consume();

        if !self.expect(TokenKind::LeftBracket) {
            return None;
        }
        self.consume();

        let mut fields: Vec<(TypeId, String)> = Vec::new();
        while !self.check(TokenKind::RightBracket) && !self.at_end() {
            let save = self.position;
            if self.check(TokenKind::Semicolon) {
                self.consume();
                continue;
            }
            let Some(field_ty) = self.parse_type() else {
                self.recover_in_block(save);
                continue;
            };
            if !self.expect(TokenKind::Identifier) {
                self.recover_in_block(save);
                continue;
            }
            let field_token = self.consume();
            if self.expect(TokenKind::Semicolon) {
                self.consume();
            } else if self.check(TokenKind::Semicolon) {
                self.consume();
            }
            fields.push((field_ty, field_token.text));
        }

        let close_span = self.current().span;
        if self.expect(TokenKind::RightBracket) {
            self.consume();
        }

        let ty = match self.ctx.types.register_struct(&name_token.text, fields) {
            Ok(ty) => ty,
            Err(err) => {
                self.report(E_DUPLICATE_STRUCT, name_token.span, err.to_string());
                self.ctx.types.get(&name_token.text)?
            }
        };

        Some(AstNode::StructDecl {
            ty,
            span: keyword.span.merge(close_span),
        })
    }

    /// `class Name { member; ... }`.
    ///
    /// The struct type is forward-registered before the body so member
    /// types may mention `Name` and `Name*`. Members are fields
    /// (`T name;`), constructors (the class name followed by a
    /// parameter list) or methods (`T name(params) = body;`). The
    /// struct body is finalized afterwards and a synthetic `;` is
    /// injected, as for compound statements.
    pub(crate) fn parse_class_definition(&mut self) -> Option<AstNode> {
        let keyword = self.consume(); // class
        if !self.expect(TokenKind::Identifier) {
            return None;
        }
        let name_token = self.consume();
        let class_name = name_token.text.clone();

        let class_ty = match self.ctx.types.register_struct(&class_name, Vec::new()) {
            Ok(ty) => ty,
            Err(err) => {
                self.report(E_DUPLICATE_STRUCT, name_token.span, err.to_string());
                self.ctx.types.get(&class_name)?
            }
        };

        if !self.expect(TokenKind::LeftBracket) {
            return None;
        }
        self.consume();

        let mut struct_fields: Vec<(TypeId, String)> = Vec::new();
        let mut fields: Vec<ClassField> = Vec::new();
        let mut methods: Vec<ClassMethod> = Vec::new();

        while !self.check(TokenKind::RightBracket) && !self.at_end() {
            let save = self.position;
            if self.check(TokenKind::Semicolon) {
                self.consume();
                continue;
            }

            // A member spelled with the class's own name directly
            // followed by `(` is the constructor; `C* next;` stays a
            // field.
            let is_constructor = {
                let token = self.current();
                (token.kind == TokenKind::Identifier || token.kind == TokenKind::Type)
                    && token.text == class_name
                    && self.peek(1).kind == TokenKind::LeftParen
            };

            if is_constructor {
                let ctor_token = self.consume();
                match self.parse_class_callable(class_ty, ctor_token.text, None, ctor_token.span)
                {
                    Some(method) => methods.push(method),
                    None => self.recover_in_block(save),
                }
                continue;
            }

            let Some(member_ty) = self.parse_type() else {
                self.recover_in_block(save);
                continue;
            };
            if !self.expect(TokenKind::Identifier) {
                self.recover_in_block(save);
                continue;
            }
            let member_token = self.consume();

            if self.check(TokenKind::LeftParen) {
                match self.parse_class_callable(
                    class_ty,
                    member_token.text,
                    Some(member_ty),
                    member_token.span,
                ) {
                    Some(method) => methods.push(method),
                    None => self.recover_in_block(save),
                }
            } else {
                if self.expect(TokenKind::Semicolon) {
                    self.consume();
                } else if self.check(TokenKind::Semicolon) {
                    self.consume();
                }
                struct_fields.push((member_ty, member_token.text.clone()));
                fields.push(ClassField {
                    ty: member_ty,
                    name: member_token.text,
                });
            }
        }

        let close_span = self.current().span;
        if self.expect(TokenKind::RightBracket) {
            self.consume();
        }

        self.ctx.types.set_struct_body(class_ty, struct_fields);
        self.inject_semicolon();

        Some(AstNode::ClassDefinition {
            name: class_name,
            ty: class_ty,
            fields,
            methods,
            span: keyword.span.merge(close_span),
        })
    }

    /// `(params) = body;` for a constructor (`return_type` is `None`;
    /// `this` is the class by value) or a method (`this` is a pointer
    /// to the class).
    fn parse_class_callable(
        &mut self,
        class_ty: TypeId,
        name: String,
        return_type: Option<TypeId>,
        name_span: Span,
    ) -> Option<ClassMethod> {
        let scope = self.ctx.scopes.new_scope(self.scope());
        let params = self.parse_parameter_list(Some(scope))?;

        if !self.expect(TokenKind::Equals) {
            return None;
        }
        self.consume();

        let this_ty = if return_type.is_none() {
            class_ty
        } else {
            self.ctx.types.create_pointer(class_ty)
        };
        if let Err(err) = self.ctx.scopes.declare_local(scope, "this", this_ty, name_span) {
            self.report(E_REDECLARATION, name_span, err.to_string());
        }

        let body = self.with_scope(scope, |p| {
            p.with_return_type(return_type, |p| p.parse_expression(0))
        })?;

        if self.expect(TokenKind::Semicolon) {
            self.consume();
        }

        self.ctx.types.add_method(
            class_ty,
            MethodSig {
                name: name.clone(),
                return_type,
                params: params.iter().map(|p| (p.ty, p.name.clone())).collect(),
            },
        );

        Some(ClassMethod {
            name,
            return_type,
            params,
            scope,
            body: Box::new(body),
            span: name_span,
        })
    }
}
