#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use serde_json::Value;

/// A trimmed-down Swagger Petstore covering servers with variables, path
/// parameters, security, request bodies and responses.
pub const PETSTORE: &str = r##"
openapi: 3.0.3
info:
  title: Swagger Petstore
  version: 1.0.0
servers:
  - url: http://petstore.swagger.io/v2
  - url: https://{name}.example.com:{port}/{basePath}
    variables:
      name:
        default: demo
      port:
        default: "443"
      basePath:
        default: v2
tags:
  - name: pet
    description: Everything about your Pets
  - name: store
    description: Access to Petstore orders
security:
  - petstore_auth: [write:pets]
paths:
  /pet:
    post:
      tags: [pet]
      summary: Add a new pet to the store
      operationId: addPet
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
          application/xml:
            schema:
              $ref: '#/components/schemas/Pet'
      responses:
        '405':
          description: Invalid input
  /pet/findByStatus:
    get:
      tags: [pet]
      operationId: findPetsByStatus
      parameters:
        - name: status
          in: query
          required: true
          schema:
            type: array
            items:
              type: string
              enum: [available, pending, sold]
              default: available
      responses:
        '200':
          description: successful operation
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/Pet'
  /pet/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        schema:
          type: integer
          format: int64
    get:
      tags: [pet]
      operationId: getPetById
      security:
        - api_key: []
      responses:
        '200':
          description: successful operation
          headers:
            X-Rate-Limit:
              description: calls per hour allowed by the user
              schema:
                type: integer
                format: int32
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
        '404':
          description: Pet not found
    delete:
      tags: [pet]
      operationId: deletePet
      parameters:
        - name: api_key
          in: header
          schema:
            type: string
      responses:
        '400':
          description: Invalid pet value
  /store/order/{orderId}:
    get:
      tags: [store]
      operationId: getOrderById
      parameters:
        - name: orderId
          in: path
          required: true
          schema:
            type: integer
            format: int64
      responses:
        '200':
          description: successful operation
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Order'
components:
  schemas:
    Category:
      type: object
      properties:
        id:
          type: integer
          format: int64
        name:
          type: string
    Pet:
      type: object
      required: [name, photoUrls]
      properties:
        id:
          type: integer
          format: int64
          readOnly: true
        category:
          $ref: '#/components/schemas/Category'
        name:
          type: string
          example: doggie
        photoUrls:
          type: array
          items:
            type: string
        status:
          type: string
          description: pet status in the store
          enum: [available, pending, sold]
    Order:
      type: object
      properties:
        id:
          type: integer
          format: int64
        complete:
          type: boolean
          default: false
  securitySchemes:
    petstore_auth:
      type: oauth2
      flows:
        implicit:
          authorizationUrl: http://petstore.swagger.io/oauth/dialog
          scopes:
            write:pets: modify pets in your account
    api_key:
      type: apiKey
      name: api_key
      in: header
"##;

pub fn petstore() -> Value {
    serde_yaml::from_str(PETSTORE).unwrap()
}
